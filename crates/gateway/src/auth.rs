//! Credential headers derived from an integration's `auth_type` and
//! `auth_config`.
//!
//! | auth_type        | auth_config fields                  | header                          |
//! |------------------|-------------------------------------|---------------------------------|
//! | `api_key`        | `key`, optional `header`            | `<header or X-API-Key>: <key>`  |
//! | `basic`          | `username`, `password`              | `Authorization: Basic <b64>`    |
//! | `jwt` / `oauth2` | `token` or `access_token`           | `Authorization: Bearer <token>` |
//! | `custom`         | `headers` (object of strings)       | each entry as-is                |
//!
//! Missing fields produce no header; the provider is left to reject the call.

use afya_core::integrations::AuthType;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

/// Header used for `api_key` integrations that do not name their own.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Build the credential header layer as a JSON object.
pub fn auth_headers(auth_type: AuthType, auth_config: &Value) -> Value {
    let field = |name: &str| auth_config.get(name).and_then(Value::as_str);
    let mut headers = Map::new();

    match auth_type {
        AuthType::ApiKey => {
            if let Some(key) = field("key") {
                let header = field("header").unwrap_or(DEFAULT_API_KEY_HEADER);
                headers.insert(header.to_string(), Value::String(key.to_string()));
            }
        }
        AuthType::Basic => {
            if let (Some(user), Some(pass)) = (field("username"), field("password")) {
                let encoded = STANDARD.encode(format!("{user}:{pass}"));
                headers.insert(
                    "Authorization".to_string(),
                    Value::String(format!("Basic {encoded}")),
                );
            }
        }
        AuthType::Jwt | AuthType::Oauth2 => {
            if let Some(token) = field("token").or_else(|| field("access_token")) {
                headers.insert(
                    "Authorization".to_string(),
                    Value::String(format!("Bearer {token}")),
                );
            }
        }
        AuthType::Custom => {
            if let Some(custom) = auth_config.get("headers").and_then(Value::as_object) {
                for (name, value) in custom {
                    if value.is_string() {
                        headers.insert(name.clone(), value.clone());
                    }
                }
            }
        }
    }

    Value::Object(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_key_uses_default_or_configured_header() {
        assert_eq!(
            auth_headers(AuthType::ApiKey, &json!({"key": "k1"})),
            json!({"X-API-Key": "k1"})
        );
        assert_eq!(
            auth_headers(AuthType::ApiKey, &json!({"key": "k1", "header": "apikey"})),
            json!({"apikey": "k1"})
        );
    }

    #[test]
    fn basic_encodes_credentials() {
        assert_eq!(
            auth_headers(AuthType::Basic, &json!({"username": "lab", "password": "pw"})),
            json!({"Authorization": "Basic bGFiOnB3"})
        );
    }

    #[test]
    fn bearer_accepts_either_token_field() {
        assert_eq!(
            auth_headers(AuthType::Jwt, &json!({"token": "t"})),
            json!({"Authorization": "Bearer t"})
        );
        assert_eq!(
            auth_headers(AuthType::Oauth2, &json!({"access_token": "a"})),
            json!({"Authorization": "Bearer a"})
        );
    }

    #[test]
    fn custom_copies_string_headers_only() {
        let config = json!({"headers": {"X-Tenant": "kisumu", "X-Bad": 1}});
        assert_eq!(
            auth_headers(AuthType::Custom, &config),
            json!({"X-Tenant": "kisumu"})
        );
    }

    #[test]
    fn missing_fields_yield_no_headers() {
        assert_eq!(auth_headers(AuthType::Basic, &json!({"username": "x"})), json!({}));
        assert_eq!(auth_headers(AuthType::ApiKey, &Value::Null), json!({}));
    }
}

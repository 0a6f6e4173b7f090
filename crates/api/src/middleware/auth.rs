//! JWT bearer authentication for gateway and reminder endpoints.

use afya_core::error::CoreError;
use afya_core::types::DbId;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Caller identified by the `Authorization: Bearer <jwt>` header.
///
/// `user_id` keys the caller's rate-limit quota and is stamped on audit
/// entries and reminders it creates.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Subject of the token (`claims.sub`).
    pub user_id: DbId,
    /// Role name, e.g. `"admin"`, `"chw_supervisor"`, or `"service"`.
    pub role: String,
}

impl AuthUser {
    /// Whether the caller holds one of `roles`.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.contains(&self.role.as_str())
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Pull the token out of the `Authorization` header. The scheme name is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        assert_matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );
        assert_matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );
        assert_matches!(
            bearer_token(&headers("Bearer ")),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );
    }

    #[test]
    fn role_membership() {
        let user = AuthUser {
            user_id: 3,
            role: "service".to_string(),
        };
        assert!(user.has_any_role(&["admin", "service"]));
        assert!(!user.has_any_role(&["admin"]));
    }
}

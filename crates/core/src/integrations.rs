//! Integration registry and route catalog domain types and validation.
//!
//! Covers the enums stored as text columns on `integrations`,
//! `integration_routes`, and `integration_transformations`, plus the pure
//! helpers the gateway uses to build outbound requests (URL joining and
//! header merging).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of an integration, route, or transformation name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of a route path template.
pub const MAX_PATH_LENGTH: usize = 1000;

/// Downstream timeout applied when a route does not configure one.
pub const DEFAULT_ROUTE_TIMEOUT_SECS: i32 = 30;

/// Upper bound for a configured route timeout.
pub const MAX_ROUTE_TIMEOUT_SECS: i32 = 300;

// ---------------------------------------------------------------------------
// IntegrationType
// ---------------------------------------------------------------------------

/// The category of external system an integration talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    Payment,
    Laboratory,
    Pharmacy,
    Insurance,
    Referral,
    Custom,
}

impl IntegrationType {
    pub const ALL: [IntegrationType; 6] = [
        Self::Payment,
        Self::Laboratory,
        Self::Pharmacy,
        Self::Insurance,
        Self::Referral,
        Self::Custom,
    ];

    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Laboratory => "laboratory",
            Self::Pharmacy => "pharmacy",
            Self::Insurance => "insurance",
            Self::Referral => "referral",
            Self::Custom => "custom",
        }
    }

    /// Parse from a wire-format string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "payment" => Ok(Self::Payment),
            "laboratory" => Ok(Self::Laboratory),
            "pharmacy" => Ok(Self::Pharmacy),
            "insurance" => Ok(Self::Insurance),
            "referral" => Ok(Self::Referral),
            "custom" => Ok(Self::Custom),
            _ => Err(CoreError::Validation(format!(
                "Invalid integration_type: '{s}'. Must be one of: payment, laboratory, \
                 pharmacy, insurance, referral, custom"
            ))),
        }
    }
}

impl std::fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuthType
// ---------------------------------------------------------------------------

/// How outbound calls to an integration authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    ApiKey,
    Oauth2,
    Basic,
    Jwt,
    Custom,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::Oauth2 => "oauth2",
            Self::Basic => "basic",
            Self::Jwt => "jwt",
            Self::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "api_key" => Ok(Self::ApiKey),
            "oauth2" => Ok(Self::Oauth2),
            "basic" => Ok(Self::Basic),
            "jwt" => Ok(Self::Jwt),
            "custom" => Ok(Self::Custom),
            _ => Err(CoreError::Validation(format!(
                "Invalid auth_type: '{s}'. Must be one of: api_key, oauth2, basic, jwt, custom"
            ))),
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IntegrationStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an integration. Only `Active` integrations execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Pending,
    Active,
    Inactive,
    Failed,
}

impl IntegrationStatus {
    pub const ALL: [IntegrationStatus; 4] =
        [Self::Pending, Self::Active, Self::Inactive, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!(
                "Invalid status: '{s}'. Must be one of: pending, active, inactive, failed"
            ))),
        }
    }

    /// `Pending` is only assigned at creation; every other move is allowed.
    pub fn can_transition_to(&self, next: IntegrationStatus) -> bool {
        next != Self::Pending || *self == Self::Pending
    }
}

impl std::fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// HTTP methods a route may be called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parse case-insensitively (`"post"` and `"POST"` are both accepted).
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(CoreError::Validation(format!(
                "Invalid method: '{s}'. Must be one of: GET, POST, PUT, PATCH, DELETE"
            ))),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransformationType
// ---------------------------------------------------------------------------

/// Whether a stored transformation targets the request or the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationType {
    Request,
    Response,
}

impl TransformationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "request" => Ok(Self::Request),
            "response" => Ok(Self::Response),
            _ => Err(CoreError::Validation(format!(
                "Invalid transformation_type: '{s}'. Must be one of: request, response"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a display name: non-blank and at most [`MAX_NAME_LENGTH`] chars.
pub fn validate_name(field: &str, name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that a base URL is an absolute `http` or `https` URL with a host.
pub fn validate_base_url(url: &str) -> Result<(), CoreError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "base_url must start with http:// or https://, got '{url}'"
            ))
        })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(format!(
            "base_url must contain a host and no whitespace, got '{url}'"
        )));
    }
    Ok(())
}

/// Validate a route path template (non-empty, no whitespace, bounded length).
pub fn validate_route_path(path: &str) -> Result<(), CoreError> {
    if path.trim().is_empty() {
        return Err(CoreError::Validation("path must not be empty".into()));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(
            "path must not contain whitespace".into(),
        ));
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(CoreError::Validation(format!(
            "path must be at most {MAX_PATH_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a per-minute quota. `None` means unlimited.
pub fn validate_rate_limit(rate_limit: Option<i32>) -> Result<(), CoreError> {
    match rate_limit {
        Some(n) if n < 1 => Err(CoreError::Validation(format!(
            "rate_limit_per_minute must be at least 1, got {n}"
        ))),
        _ => Ok(()),
    }
}

/// Validate a downstream timeout in seconds.
pub fn validate_timeout(timeout_secs: i32) -> Result<(), CoreError> {
    if !(1..=MAX_ROUTE_TIMEOUT_SECS).contains(&timeout_secs) {
        return Err(CoreError::Validation(format!(
            "timeout_secs must be between 1 and {MAX_ROUTE_TIMEOUT_SECS}, got {timeout_secs}"
        )));
    }
    Ok(())
}

/// Validate a header map supplied as JSON: an object whose values are strings.
pub fn validate_headers(headers: &serde_json::Value) -> Result<(), CoreError> {
    let obj = headers
        .as_object()
        .ok_or_else(|| CoreError::Validation("headers must be a JSON object".into()))?;
    for (name, value) in obj {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("header names must not be empty".into()));
        }
        if !value.is_string() {
            return Err(CoreError::Validation(format!(
                "header '{name}' must have a string value"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request composition
// ---------------------------------------------------------------------------

/// Join a base URL and a path with exactly one separating slash.
///
/// An empty path yields the base URL without a trailing slash.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Merge header layers left to right; later layers win.
///
/// Names are compared case-insensitively, and the casing of the layer that
/// wins is the one kept. Non-string values and non-object layers are ignored.
pub fn merge_headers<'a, I>(layers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a serde_json::Value>,
{
    let mut merged: BTreeMap<String, (String, String)> = BTreeMap::new();
    for layer in layers {
        let Some(obj) = layer.as_object() else {
            continue;
        };
        for (name, value) in obj {
            if let Some(v) = value.as_str() {
                merged.insert(name.to_ascii_lowercase(), (name.clone(), v.to_string()));
            }
        }
    }
    merged.into_values().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

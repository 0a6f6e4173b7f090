//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?is_active=` filter for listing routes. Absent means both.
#[derive(Debug, Deserialize)]
pub struct ActiveFilterParams {
    pub is_active: Option<bool>,
}

//! Route catalog models and DTOs.

use afya_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `integration_routes` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IntegrationRoute {
    pub id: DbId,
    pub integration_id: DbId,
    pub name: Option<String>,
    pub path: String,
    pub method: String,
    pub request_schema: Option<serde_json::Value>,
    pub response_schema: Option<serde_json::Value>,
    pub rate_limit_per_minute: Option<i32>,
    pub timeout_secs: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for adding a route to an integration.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntegrationRoute {
    pub integration_id: DbId,
    pub name: Option<String>,
    pub path: String,
    pub method: String,
    pub request_schema: Option<serde_json::Value>,
    pub response_schema: Option<serde_json::Value>,
    pub rate_limit_per_minute: Option<i32>,
    pub timeout_secs: Option<i32>,
    pub is_active: Option<bool>,
}

/// Partial update for a route. Absent fields keep their value.
///
/// `rate_limit_per_minute` cannot be cleared back to unlimited through a
/// patch; set `clear_rate_limit` for that.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIntegrationRoute {
    pub name: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    pub request_schema: Option<serde_json::Value>,
    pub response_schema: Option<serde_json::Value>,
    pub rate_limit_per_minute: Option<i32>,
    #[serde(default)]
    pub clear_rate_limit: bool,
    pub timeout_secs: Option<i32>,
    pub is_active: Option<bool>,
}

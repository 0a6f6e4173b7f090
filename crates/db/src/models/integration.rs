//! Integration registry models and DTOs.

use afya_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `integrations` table.
///
/// `auth_config` holds credentials and is never serialized back to clients.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Integration {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub integration_type: String,
    pub base_url: String,
    pub auth_type: String,
    #[serde(skip_serializing, default)]
    pub auth_config: serde_json::Value,
    pub headers: serde_json::Value,
    pub status: String,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for registering a new integration. Status always starts `pending`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntegration {
    pub name: String,
    pub description: Option<String>,
    pub integration_type: String,
    pub base_url: String,
    pub auth_type: String,
    pub auth_config: Option<serde_json::Value>,
    pub headers: Option<serde_json::Value>,
    #[serde(skip)]
    pub created_by: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Partial update for an integration. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIntegration {
    pub name: Option<String>,
    pub description: Option<String>,
    pub integration_type: Option<String>,
    pub base_url: Option<String>,
    pub auth_type: Option<String>,
    pub auth_config: Option<serde_json::Value>,
    pub headers: Option<serde_json::Value>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Query parameters for listing integrations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationFilter {
    pub integration_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

//! Audit log models for gateway executions.

use afya_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `integration_logs` table.
///
/// `completed_at IS NULL` means the downstream call is still in flight.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IntegrationLog {
    pub id: DbId,
    pub request_id: Uuid,
    pub integration_id: DbId,
    pub route_id: DbId,
    pub user_id: Option<DbId>,
    pub ip_address: Option<String>,
    pub method: String,
    pub path: String,
    pub request_headers: serde_json::Value,
    pub request_body: Option<serde_json::Value>,
    pub status_code: Option<i32>,
    pub response_headers: Option<serde_json::Value>,
    pub response_body: Option<serde_json::Value>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Create / complete DTOs
// ---------------------------------------------------------------------------

/// Pre-call audit entry.
#[derive(Debug, Clone)]
pub struct CreateIntegrationLog {
    pub request_id: Uuid,
    pub integration_id: DbId,
    pub route_id: DbId,
    pub user_id: Option<DbId>,
    pub ip_address: Option<String>,
    pub method: String,
    pub path: String,
    pub request_headers: serde_json::Value,
    pub request_body: Option<serde_json::Value>,
}

/// Post-call outcome. Exactly one of `status_code` / `error` is set.
#[derive(Debug, Clone, Default)]
pub struct CompleteIntegrationLog {
    pub status_code: Option<i32>,
    pub response_headers: Option<serde_json::Value>,
    pub response_body: Option<serde_json::Value>,
    pub duration_ms: i64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Query parameters for `GET /integrations/routes/{id}/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationLogQuery {
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub limit: Option<i64>,
}

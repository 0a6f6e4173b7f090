//! Stored request/response transformations attached to routes.
//!
//! These are configuration only; the gateway does not apply them.

use afya_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `integration_transformations` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transformation {
    pub id: DbId,
    pub route_id: DbId,
    pub name: String,
    pub transformation_type: String,
    pub script: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransformation {
    pub name: String,
    pub transformation_type: String,
    pub script: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTransformation {
    pub name: Option<String>,
    pub transformation_type: Option<String>,
    pub script: Option<String>,
    pub is_active: Option<bool>,
}

//! Per-channel reminder provider configuration.

use afya_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reminder_providers` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReminderProvider {
    pub id: DbId,
    pub channel: String,
    pub name: String,
    pub endpoint_url: String,
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub sender_id: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Body of `PUT /reminders/providers/{channel}`; creates or replaces.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertReminderProvider {
    pub name: String,
    pub endpoint_url: String,
    pub api_key: Option<String>,
    pub sender_id: Option<String>,
    pub is_active: Option<bool>,
}

//! Patient reminder models and DTOs.

use afya_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `reminders` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reminder {
    pub id: DbId,
    pub patient_ref: String,
    pub recipient: String,
    pub channel: String,
    pub message: String,
    pub scheduled_for: Timestamp,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_error: Option<String>,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    /// Set while a dispatcher is sending; cleared when the attempt is recorded.
    pub claimed_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for scheduling a reminder. `scheduled_for` defaults to now.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminder {
    pub patient_ref: String,
    pub recipient: String,
    pub channel: String,
    pub message: String,
    pub scheduled_for: Option<Timestamp>,
    pub max_retries: Option<i32>,
    #[serde(skip)]
    pub created_by: Option<DbId>,
}

/// Edits allowed while a reminder is still pending.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReminder {
    pub recipient: Option<String>,
    pub message: Option<String>,
    pub scheduled_for: Option<Timestamp>,
    pub max_retries: Option<i32>,
}

/// Request body for the delivery-receipt callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkDelivered {
    pub provider_message_id: Option<String>,
}

/// Query parameters for listing reminders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderFilter {
    pub status: Option<String>,
    pub channel: Option<String>,
    pub patient_ref: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

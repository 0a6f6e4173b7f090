//! Rate-limit window rows.

use afya_core::rate_limit::WindowState;
use afya_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `rate_limit_windows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RateLimitWindow {
    pub id: DbId,
    pub route_id: DbId,
    pub caller_key: String,
    pub user_id: Option<DbId>,
    pub ip_address: Option<String>,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub request_count: i64,
}

impl RateLimitWindow {
    pub fn state(&self) -> WindowState {
        WindowState {
            window_start: self.window_start,
            window_end: self.window_end,
            count: self.request_count,
        }
    }
}

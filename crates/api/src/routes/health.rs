use afya_db::repositories::ReminderRepo;
use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Where rate-limit windows are kept (`postgres` or `memory`).
    pub rate_limit_backend: &'static str,
    /// Pending reminders already past their send time. Absent when the
    /// database is down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_reminders: Option<i64>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = afya_db::health_check(&state.pool).await.is_ok();
    let due_reminders = if db_healthy {
        ReminderRepo::count_due(&state.pool).await.ok()
    } else {
        None
    };

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        rate_limit_backend: state.config.rate_limit_backend.as_str(),
        due_reminders,
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

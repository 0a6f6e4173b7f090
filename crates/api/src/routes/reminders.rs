//! Route definitions for patient reminders.
//!
//! ```text
//! POST   /                                  create_reminder
//! GET    /                                  list_reminders (?status, channel, patient_ref, limit, offset)
//! GET    /{id}                              get_reminder
//! PUT    /{id}                              update_reminder (pending only)
//! POST   /{id}/cancel                       cancel_reminder
//! POST   /{id}/delivered                    mark_delivered (service or admin)
//!
//! GET    /providers                         list_providers (admin)
//! PUT    /providers/{channel}               upsert_provider (admin)
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::reminders;
use crate::state::AppState;

/// Reminder routes -- mounted at `/reminders`.
pub fn reminders_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(reminders::create_reminder).get(reminders::list_reminders),
        )
        .route("/providers", get(reminders::list_providers))
        .route("/providers/{channel}", put(reminders::upsert_provider))
        .route(
            "/{id}",
            get(reminders::get_reminder).put(reminders::update_reminder),
        )
        .route("/{id}/cancel", post(reminders::cancel_reminder))
        .route("/{id}/delivered", post(reminders::mark_delivered))
}

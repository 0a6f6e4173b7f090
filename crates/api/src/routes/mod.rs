pub mod health;
pub mod integrations;
pub mod reminders;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /integrations                                    list, register (admin)
/// /integrations/stats                              registry/audit statistics
/// /integrations/{id}                               get, update (admin)
/// /integrations/{id}/routes                        list routes (?is_active)
/// /integrations/routes                             create route (admin)
/// /integrations/routes/{id}                        get, update (admin)
/// /integrations/routes/{id}/execute                call the external system (POST)
/// /integrations/routes/{id}/logs                   audit log (?start_date, end_date, limit)
/// /integrations/routes/{id}/transformations        list, create (admin)
/// /integrations/transformations/{id}               update, delete (admin)
///
/// /reminders                                       list, schedule
/// /reminders/{id}                                  get, update (pending only)
/// /reminders/{id}/cancel                           cancel (POST)
/// /reminders/{id}/delivered                        delivery receipt (service)
/// /reminders/providers                             list providers (admin)
/// /reminders/providers/{channel}                   upsert provider (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/integrations", integrations::integrations_router())
        .nest("/reminders", reminders::reminders_router())
}

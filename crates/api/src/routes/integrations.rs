//! Route definitions for the integration gateway.
//!
//! ```text
//! REGISTRY:
//! POST   /                                  create_integration (admin)
//! GET    /                                  list_integrations (?integration_type, status, limit, offset)
//! GET    /stats                             get_integration_stats
//! GET    /{id}                              get_integration
//! PUT    /{id}                              update_integration (admin)
//! GET    /{id}/routes                       list_routes (?is_active)
//!
//! ROUTE CATALOG:
//! POST   /routes                            create_route (admin)
//! GET    /routes/{id}                       get_route
//! PUT    /routes/{id}                       update_route (admin)
//! POST   /routes/{id}/execute               execute_route
//! GET    /routes/{id}/logs                  list_route_logs (?start_date, end_date, limit)
//!
//! TRANSFORMATIONS:
//! GET    /routes/{id}/transformations       list_transformations
//! POST   /routes/{id}/transformations       create_transformation (admin)
//! PUT    /transformations/{id}              update_transformation (admin)
//! DELETE /transformations/{id}              delete_transformation (admin)
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::integrations;
use crate::state::AppState;

/// Integration routes -- mounted at `/integrations`.
pub fn integrations_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(integrations::create_integration).get(integrations::list_integrations),
        )
        .route("/stats", get(integrations::get_integration_stats))
        .route(
            "/{id}",
            get(integrations::get_integration).put(integrations::update_integration),
        )
        .route("/{id}/routes", get(integrations::list_routes))
        .route("/routes", post(integrations::create_route))
        .route(
            "/routes/{id}",
            get(integrations::get_route).put(integrations::update_route),
        )
        .route("/routes/{id}/execute", post(integrations::execute_route))
        .route("/routes/{id}/logs", get(integrations::list_route_logs))
        .route(
            "/routes/{id}/transformations",
            get(integrations::list_transformations).post(integrations::create_transformation),
        )
        .route(
            "/transformations/{id}",
            put(integrations::update_transformation).delete(integrations::delete_transformation),
        )
}

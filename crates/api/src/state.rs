use std::sync::Arc;

use afya_core::rate_limit::{InMemoryRateLimiter, RateLimiter};
use afya_db::repositories::PgRateLimiter;
use afya_gateway::IntegrationGateway;

use crate::config::{RateLimitBackend, ServerConfig};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: afya_db::DbPool,
    /// Server configuration (JWT secret, timeouts).
    pub config: Arc<ServerConfig>,
    /// Executes calls against registered integrations.
    pub gateway: IntegrationGateway,
}

/// Build the rate limiter selected by `RATE_LIMIT_BACKEND`.
pub fn build_rate_limiter(
    backend: RateLimitBackend,
    pool: &afya_db::DbPool,
) -> Arc<dyn RateLimiter> {
    match backend {
        RateLimitBackend::Postgres => Arc::new(PgRateLimiter::new(pool.clone())),
        RateLimitBackend::Memory => Arc::new(InMemoryRateLimiter::new()),
    }
}

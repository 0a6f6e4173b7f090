//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. [`PgRateLimiter`] is the
//! exception: it owns a pool so it can sit behind `Arc<dyn RateLimiter>`.

pub mod integration_log_repo;
pub mod integration_repo;
pub mod integration_route_repo;
pub mod integration_stats_repo;
pub mod rate_limit_repo;
pub mod reminder_provider_repo;
pub mod reminder_repo;
pub mod transformation_repo;

pub use integration_log_repo::IntegrationLogRepo;
pub use integration_repo::IntegrationRepo;
pub use integration_route_repo::IntegrationRouteRepo;
pub use integration_stats_repo::IntegrationStatsRepo;
pub use rate_limit_repo::{PgRateLimiter, RateLimitRepo};
pub use reminder_provider_repo::ReminderProviderRepo;
pub use reminder_repo::ReminderRepo;
pub use transformation_repo::TransformationRepo;

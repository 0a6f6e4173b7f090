//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod integration;
pub mod integration_log;
pub mod integration_route;
pub mod integration_stats;
pub mod rate_limit;
pub mod reminder;
pub mod reminder_provider;
pub mod transformation;

//! Domain types, validation, and rate-limit logic for the Afya backend.
//!
//! This crate performs no I/O. Persistence lives in `afya-db`, outbound
//! calls in `afya-gateway` and `afya-reminders`.

pub mod error;
pub mod integrations;
pub mod rate_limit;
pub mod reminders;
pub mod roles;
pub mod search;
pub mod stats;
pub mod types;

//! Request handlers.
//!
//! Each submodule provides async handler functions for one area of the API.
//! Handlers validate input with `afya_core`, delegate to the repositories in
//! `afya_db` (or the gateway), and map errors via [`crate::error::AppError`].

pub mod integrations;
pub mod reminders;

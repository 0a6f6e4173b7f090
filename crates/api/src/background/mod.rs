//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn`. All tasks accept a [`CancellationToken`]
//! for graceful shutdown. The reminder dispatcher lives in
//! `afya_reminders` and is spawned alongside these from `main`.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod rate_limit_cleanup;
pub mod violation_retention;

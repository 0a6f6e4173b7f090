//! Periodic removal of closed rate-limit windows.
//!
//! Windows are reset lazily on the next call, so expired rows only cost
//! storage. This job keeps the table (or map) from growing with one row per
//! caller that ever called a limited route.

use std::sync::Arc;
use std::time::Duration;

use afya_core::rate_limit::RateLimiter;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(600); // 10 minutes

/// Run the cleanup loop until `cancel` is triggered.
pub async fn run(limiter: Arc<dyn RateLimiter>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Rate limit cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limit cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match limiter.purge_expired(Utc::now()).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Rate limit cleanup: purged expired windows");
                        } else {
                            tracing::debug!("Rate limit cleanup: no windows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rate limit cleanup: purge failed");
                    }
                }
            }
        }
    }
}

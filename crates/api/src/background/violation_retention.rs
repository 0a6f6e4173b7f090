//! Periodic pruning of old rate-limit violation records.
//!
//! Violations only feed the integration stats, so rows older than the
//! retention period are deleted on a fixed interval.

use std::time::Duration;

use afya_db::repositories::RateLimitRepo;
use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Default retention period: 30 days.
const DEFAULT_RETENTION_DAYS: i64 = 30;

/// How often the pruning job runs.
const PRUNE_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the violation retention loop until `cancel` is triggered.
///
/// Retention comes from `RATE_LIMIT_VIOLATION_RETENTION_DAYS` (defaults
/// to 30).
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    let retention_days: i64 = std::env::var("RATE_LIMIT_VIOLATION_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_RETENTION_DAYS);

    tracing::info!(
        retention_days,
        interval_secs = PRUNE_INTERVAL.as_secs(),
        "Violation retention job started"
    );

    let mut interval = tokio::time::interval(PRUNE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Violation retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(retention_days);
                match RateLimitRepo::delete_violations_older_than(&pool, cutoff).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Violation retention: purged old rows");
                    }
                    Ok(_) => tracing::debug!("Violation retention: no rows to purge"),
                    Err(e) => {
                        tracing::error!(error = %e, "Violation retention: cleanup failed");
                    }
                }
            }
        }
    }
}

//! Aggregate queries for the integration statistics endpoint.

use afya_core::integrations::{IntegrationStatus, IntegrationType};
use afya_core::stats::{bucket_status_codes, counts_with_defaults};
use sqlx::PgPool;

use crate::models::integration_stats::IntegrationStats;
use crate::repositories::{IntegrationLogRepo, RateLimitRepo, TransformationRepo};

/// Number of recent log entries included in the stats payload.
const RECENT_LOG_COUNT: i64 = 10;

/// Read-only aggregate queries over integrations, routes, and logs.
pub struct IntegrationStatsRepo;

impl IntegrationStatsRepo {
    /// Collect all gateway statistics.
    pub async fn collect(pool: &PgPool) -> Result<IntegrationStats, sqlx::Error> {
        let by_type: Vec<(String, i64)> = sqlx::query_as(
            "SELECT integration_type, COUNT(*) FROM integrations GROUP BY integration_type",
        )
        .fetch_all(pool)
        .await?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM integrations GROUP BY status")
                .fetch_all(pool)
                .await?;

        let (total_routes, active_routes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM integration_routes",
        )
        .fetch_one(pool)
        .await?;

        let by_code: Vec<(Option<i32>, i64)> = sqlx::query_as(
            "SELECT status_code, COUNT(*) FROM integration_logs
             WHERE completed_at IS NOT NULL
             GROUP BY status_code",
        )
        .fetch_all(pool)
        .await?;

        let (total_requests, avg_duration_ms): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(duration_ms)::DOUBLE PRECISION FROM integration_logs",
        )
        .fetch_one(pool)
        .await?;

        let type_labels: Vec<&str> = IntegrationType::ALL.iter().map(|t| t.as_str()).collect();
        let status_labels: Vec<&str> =
            IntegrationStatus::ALL.iter().map(|s| s.as_str()).collect();

        let integrations_by_type = counts_with_defaults(&type_labels, by_type);
        let integrations_by_status = counts_with_defaults(&status_labels, by_status);
        let total_integrations = integrations_by_status.values().sum();

        Ok(IntegrationStats {
            total_integrations,
            integrations_by_type,
            integrations_by_status,
            total_routes,
            active_routes,
            total_requests,
            requests_by_status_class: bucket_status_codes(by_code),
            avg_duration_ms,
            recent_logs: IntegrationLogRepo::list_recent(pool, RECENT_LOG_COUNT).await?,
            rate_limit_violations: RateLimitRepo::count_violations(pool, None).await?,
            transformation_count: TransformationRepo::count(pool).await?,
        })
    }
}

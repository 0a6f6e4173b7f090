//! Repository for the `integration_logs` audit table.
//!
//! Entries are appended before the outbound call and completed exactly once
//! afterwards; nothing here deletes or rewrites a completed entry.

use afya_core::search::{clamp_limit, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT};
use afya_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::integration_log::{
    CompleteIntegrationLog, CreateIntegrationLog, IntegrationLog, IntegrationLogQuery,
};

/// Column list for integration_logs queries.
const COLUMNS: &str = "id, request_id, integration_id, route_id, user_id, ip_address, \
    method, path, request_headers, request_body, status_code, response_headers, \
    response_body, duration_ms, error, created_at, completed_at";

/// Append-and-complete access to the gateway audit trail.
pub struct IntegrationLogRepo;

impl IntegrationLogRepo {
    /// Record an execution that is about to call out.
    pub async fn append(
        pool: &PgPool,
        input: &CreateIntegrationLog,
    ) -> Result<IntegrationLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO integration_logs
                (request_id, integration_id, route_id, user_id, ip_address,
                 method, path, request_headers, request_body)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationLog>(&query)
            .bind(input.request_id)
            .bind(input.integration_id)
            .bind(input.route_id)
            .bind(input.user_id)
            .bind(&input.ip_address)
            .bind(&input.method)
            .bind(&input.path)
            .bind(&input.request_headers)
            .bind(&input.request_body)
            .fetch_one(pool)
            .await
    }

    /// Fill in the outcome of an open entry.
    ///
    /// Returns `None` when no open entry exists for `request_id`, which
    /// includes entries that were already completed.
    pub async fn complete(
        pool: &PgPool,
        request_id: Uuid,
        outcome: &CompleteIntegrationLog,
    ) -> Result<Option<IntegrationLog>, sqlx::Error> {
        let query = format!(
            "UPDATE integration_logs SET
                status_code      = $2,
                response_headers = $3,
                response_body    = $4,
                duration_ms      = $5,
                error            = $6,
                completed_at     = now()
             WHERE request_id = $1 AND completed_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationLog>(&query)
            .bind(request_id)
            .bind(outcome.status_code)
            .bind(&outcome.response_headers)
            .bind(&outcome.response_body)
            .bind(outcome.duration_ms)
            .bind(&outcome.error)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_request_id(
        pool: &PgPool,
        request_id: Uuid,
    ) -> Result<Option<IntegrationLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integration_logs WHERE request_id = $1");
        sqlx::query_as::<_, IntegrationLog>(&query)
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// Logs for one route, newest first, within an optional time range.
    pub async fn list_for_route(
        pool: &PgPool,
        route_id: DbId,
        params: &IntegrationLogQuery,
    ) -> Result<Vec<IntegrationLog>, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM integration_logs
             WHERE route_id = $1
               AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
               AND ($3::TIMESTAMPTZ IS NULL OR created_at <= $3)
             ORDER BY created_at DESC, id DESC
             LIMIT $4"
        );
        sqlx::query_as::<_, IntegrationLog>(&query)
            .bind(route_id)
            .bind(params.start_date)
            .bind(params.end_date)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Most recent logs across all routes.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<IntegrationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM integration_logs ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        sqlx::query_as::<_, IntegrationLog>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

//! Repository for the `integration_routes` table.

use afya_core::integrations::DEFAULT_ROUTE_TIMEOUT_SECS;
use afya_core::types::DbId;
use sqlx::PgPool;

use crate::models::integration_route::{
    CreateIntegrationRoute, IntegrationRoute, UpdateIntegrationRoute,
};

/// Column list for integration_routes queries.
const COLUMNS: &str = "id, integration_id, name, path, method, request_schema, \
    response_schema, rate_limit_per_minute, timeout_secs, is_active, created_at, updated_at";

/// Provides CRUD operations for the route catalog.
pub struct IntegrationRouteRepo;

impl IntegrationRouteRepo {
    /// Insert a new route, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateIntegrationRoute,
    ) -> Result<IntegrationRoute, sqlx::Error> {
        let query = format!(
            "INSERT INTO integration_routes
                (integration_id, name, path, method, request_schema, response_schema,
                 rate_limit_per_minute, timeout_secs, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, {DEFAULT_ROUTE_TIMEOUT_SECS}), COALESCE($9, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationRoute>(&query)
            .bind(input.integration_id)
            .bind(&input.name)
            .bind(&input.path)
            .bind(&input.method)
            .bind(&input.request_schema)
            .bind(&input.response_schema)
            .bind(input.rate_limit_per_minute)
            .bind(input.timeout_secs)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    /// Find a route by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<IntegrationRoute>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integration_routes WHERE id = $1");
        sqlx::query_as::<_, IntegrationRoute>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the routes of one integration, optionally only active or inactive ones.
    pub async fn list_by_integration(
        pool: &PgPool,
        integration_id: DbId,
        is_active: Option<bool>,
    ) -> Result<Vec<IntegrationRoute>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM integration_routes \
             WHERE integration_id = $1 AND ($2::BOOLEAN IS NULL OR is_active = $2) \
             ORDER BY path ASC, method ASC"
        );
        sqlx::query_as::<_, IntegrationRoute>(&query)
            .bind(integration_id)
            .bind(is_active)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateIntegrationRoute,
    ) -> Result<Option<IntegrationRoute>, sqlx::Error> {
        let query = format!(
            "UPDATE integration_routes SET
                name                  = COALESCE($1, name),
                path                  = COALESCE($2, path),
                method                = COALESCE($3, method),
                request_schema        = COALESCE($4, request_schema),
                response_schema       = COALESCE($5, response_schema),
                rate_limit_per_minute = CASE WHEN $6 THEN NULL
                                             ELSE COALESCE($7, rate_limit_per_minute) END,
                timeout_secs          = COALESCE($8, timeout_secs),
                is_active             = COALESCE($9, is_active)
             WHERE id = $10
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationRoute>(&query)
            .bind(&input.name)
            .bind(&input.path)
            .bind(&input.method)
            .bind(&input.request_schema)
            .bind(&input.response_schema)
            .bind(input.clear_rate_limit)
            .bind(input.rate_limit_per_minute)
            .bind(input.timeout_secs)
            .bind(input.is_active)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

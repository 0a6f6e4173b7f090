//! Repository for the `integrations` table.

use afya_core::search::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use afya_core::types::DbId;
use sqlx::PgPool;

use crate::models::integration::{
    CreateIntegration, Integration, IntegrationFilter, UpdateIntegration,
};

/// Column list for integrations queries.
const COLUMNS: &str = "id, name, description, integration_type, base_url, auth_type, \
    auth_config, headers, status, created_by, created_at, updated_at";

/// Provides CRUD operations for registered external systems.
pub struct IntegrationRepo;

impl IntegrationRepo {
    /// Insert a new integration in `pending` status, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateIntegration,
    ) -> Result<Integration, sqlx::Error> {
        let query = format!(
            "INSERT INTO integrations
                (name, description, integration_type, base_url, auth_type,
                 auth_config, headers, created_by)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, '{{}}'::jsonb), COALESCE($7, '{{}}'::jsonb), $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Integration>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.integration_type)
            .bind(&input.base_url)
            .bind(&input.auth_type)
            .bind(&input.auth_config)
            .bind(&input.headers)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find an integration by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Integration>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integrations WHERE id = $1");
        sqlx::query_as::<_, Integration>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List integrations newest first, optionally filtered by type and status.
    pub async fn list(
        pool: &PgPool,
        filter: &IntegrationFilter,
    ) -> Result<Vec<Integration>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 0;

        if filter.integration_type.is_some() {
            param_idx += 1;
            conditions.push(format!("integration_type = ${param_idx}"));
        }
        if filter.status.is_some() {
            param_idx += 1;
            conditions.push(format!("status = ${param_idx}"));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit_val = clamp_limit(filter.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset_val = clamp_offset(filter.offset);
        let limit_idx = param_idx + 1;
        let offset_idx = param_idx + 2;

        let query = format!(
            "SELECT {COLUMNS} FROM integrations {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );

        let mut q = sqlx::query_as::<_, Integration>(&query);
        if let Some(ref it) = filter.integration_type {
            q = q.bind(it);
        }
        if let Some(ref st) = filter.status {
            q = q.bind(st);
        }
        q.bind(limit_val).bind(offset_val).fetch_all(pool).await
    }

    /// Apply a partial update. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateIntegration,
    ) -> Result<Option<Integration>, sqlx::Error> {
        let query = format!(
            "UPDATE integrations SET
                name             = COALESCE($1, name),
                description      = COALESCE($2, description),
                integration_type = COALESCE($3, integration_type),
                base_url         = COALESCE($4, base_url),
                auth_type        = COALESCE($5, auth_type),
                auth_config      = COALESCE($6, auth_config),
                headers          = COALESCE($7, headers),
                status           = COALESCE($8, status)
             WHERE id = $9
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Integration>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.integration_type)
            .bind(&input.base_url)
            .bind(&input.auth_type)
            .bind(&input.auth_config)
            .bind(&input.headers)
            .bind(&input.status)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

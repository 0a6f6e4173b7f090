//! Repository for the `integration_transformations` table.

use afya_core::types::DbId;
use sqlx::PgPool;

use crate::models::transformation::{CreateTransformation, Transformation, UpdateTransformation};

/// Column list for integration_transformations queries.
const COLUMNS: &str =
    "id, route_id, name, transformation_type, script, is_active, created_at, updated_at";

/// Provides CRUD operations for stored route transformations.
pub struct TransformationRepo;

impl TransformationRepo {
    /// Attach a transformation to a route.
    pub async fn create(
        pool: &PgPool,
        route_id: DbId,
        input: &CreateTransformation,
    ) -> Result<Transformation, sqlx::Error> {
        let query = format!(
            "INSERT INTO integration_transformations
                (route_id, name, transformation_type, script, is_active)
             VALUES ($1, $2, $3, $4, COALESCE($5, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Transformation>(&query)
            .bind(route_id)
            .bind(&input.name)
            .bind(&input.transformation_type)
            .bind(&input.script)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Transformation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integration_transformations WHERE id = $1");
        sqlx::query_as::<_, Transformation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a route's transformations in creation order.
    pub async fn list_by_route(
        pool: &PgPool,
        route_id: DbId,
    ) -> Result<Vec<Transformation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM integration_transformations \
             WHERE route_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Transformation>(&query)
            .bind(route_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTransformation,
    ) -> Result<Option<Transformation>, sqlx::Error> {
        let query = format!(
            "UPDATE integration_transformations SET
                name                = COALESCE($1, name),
                transformation_type = COALESCE($2, transformation_type),
                script              = COALESCE($3, script),
                is_active           = COALESCE($4, is_active)
             WHERE id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Transformation>(&query)
            .bind(&input.name)
            .bind(&input.transformation_type)
            .bind(&input.script)
            .bind(input.is_active)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a transformation. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM integration_transformations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Total number of stored transformations.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM integration_transformations")
            .fetch_one(pool)
            .await
    }
}

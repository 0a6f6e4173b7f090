//! Repository for the `reminder_providers` table.

use sqlx::PgPool;

use crate::models::reminder_provider::{ReminderProvider, UpsertReminderProvider};

/// Column list for reminder_providers queries.
const COLUMNS: &str =
    "id, channel, name, endpoint_url, api_key, sender_id, is_active, created_at, updated_at";

/// One provider configuration per channel.
pub struct ReminderProviderRepo;

impl ReminderProviderRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<ReminderProvider>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reminder_providers ORDER BY channel ASC");
        sqlx::query_as::<_, ReminderProvider>(&query)
            .fetch_all(pool)
            .await
    }

    /// Providers the dispatcher may send through.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<ReminderProvider>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reminder_providers WHERE is_active ORDER BY channel ASC"
        );
        sqlx::query_as::<_, ReminderProvider>(&query)
            .fetch_all(pool)
            .await
    }

    /// Create or replace the provider for `channel`.
    pub async fn upsert(
        pool: &PgPool,
        channel: &str,
        input: &UpsertReminderProvider,
    ) -> Result<ReminderProvider, sqlx::Error> {
        let query = format!(
            "INSERT INTO reminder_providers (channel, name, endpoint_url, api_key, sender_id, is_active)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, true))
             ON CONFLICT (channel) DO UPDATE SET
                name         = EXCLUDED.name,
                endpoint_url = EXCLUDED.endpoint_url,
                api_key      = EXCLUDED.api_key,
                sender_id    = EXCLUDED.sender_id,
                is_active    = EXCLUDED.is_active
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReminderProvider>(&query)
            .bind(channel)
            .bind(&input.name)
            .bind(&input.endpoint_url)
            .bind(&input.api_key)
            .bind(&input.sender_id)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }
}

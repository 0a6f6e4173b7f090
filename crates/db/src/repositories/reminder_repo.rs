//! Repository for the `reminders` table.
//!
//! Status changes are guarded in SQL by the expected current status, so a
//! reminder that moved on concurrently is reported as "not updated" rather
//! than overwritten.

use afya_core::reminders::{FailureOutcome, DEFAULT_MAX_RETRIES, REMINDER_CLAIM_TTL_SECS};
use afya_core::search::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use afya_core::types::DbId;
use sqlx::PgPool;

use crate::models::reminder::{CreateReminder, Reminder, ReminderFilter, UpdateReminder};

/// Column list for reminders queries.
const COLUMNS: &str = "id, patient_ref, recipient, channel, message, scheduled_for, status, \
    retry_count, max_retries, last_error, provider_message_id, sent_at, delivered_at, \
    claimed_at, created_by, created_at, updated_at";

/// Provides CRUD and dispatch bookkeeping for patient reminders.
pub struct ReminderRepo;

impl ReminderRepo {
    /// Schedule a reminder. A missing `scheduled_for` means "send now".
    pub async fn create(pool: &PgPool, input: &CreateReminder) -> Result<Reminder, sqlx::Error> {
        let query = format!(
            "INSERT INTO reminders
                (patient_ref, recipient, channel, message, scheduled_for, max_retries, created_by)
             VALUES ($1, $2, $3, $4, COALESCE($5, now()), COALESCE($6, {DEFAULT_MAX_RETRIES}), $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reminder>(&query)
            .bind(&input.patient_ref)
            .bind(&input.recipient)
            .bind(&input.channel)
            .bind(&input.message)
            .bind(input.scheduled_for)
            .bind(input.max_retries)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Reminder>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reminders WHERE id = $1");
        sqlx::query_as::<_, Reminder>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List reminders by schedule, soonest first.
    pub async fn list(pool: &PgPool, filter: &ReminderFilter) -> Result<Vec<Reminder>, sqlx::Error> {
        let limit = clamp_limit(filter.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(filter.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::TEXT IS NULL OR channel = $2)
               AND ($3::TEXT IS NULL OR patient_ref = $3)
             ORDER BY scheduled_for ASC, id ASC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Reminder>(&query)
            .bind(&filter.status)
            .bind(&filter.channel)
            .bind(&filter.patient_ref)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Patch a reminder that has not been sent yet.
    ///
    /// Returns `None` if the reminder does not exist or is no longer pending.
    pub async fn update_pending(
        pool: &PgPool,
        id: DbId,
        input: &UpdateReminder,
    ) -> Result<Option<Reminder>, sqlx::Error> {
        let query = format!(
            "UPDATE reminders SET
                recipient     = COALESCE($1, recipient),
                message       = COALESCE($2, message),
                scheduled_for = COALESCE($3, scheduled_for),
                max_retries   = COALESCE($4, max_retries)
             WHERE id = $5 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reminder>(&query)
            .bind(&input.recipient)
            .bind(&input.message)
            .bind(input.scheduled_for)
            .bind(input.max_retries)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a pending reminder to `cancelled`.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<Option<Reminder>, sqlx::Error> {
        let query = format!(
            "UPDATE reminders SET status = 'cancelled'
             WHERE id = $1 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reminder>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a sent reminder to `delivered` (provider receipt).
    pub async fn mark_delivered(
        pool: &PgPool,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<Option<Reminder>, sqlx::Error> {
        let query = format!(
            "UPDATE reminders SET
                status              = 'delivered',
                delivered_at        = now(),
                provider_message_id = COALESCE($2, provider_message_id)
             WHERE id = $1 AND status = 'sent'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reminder>(&query)
            .bind(id)
            .bind(provider_message_id)
            .fetch_optional(pool)
            .await
    }

    /// Number of pending reminders whose send time has passed.
    pub async fn count_due(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM reminders WHERE status = 'pending' AND scheduled_for <= now()",
        )
        .fetch_one(pool)
        .await
    }

    /// Atomically claim up to `limit` due pending reminders.
    ///
    /// Claimed rows are skipped by other dispatchers until the attempt is
    /// recorded or the claim is older than [`REMINDER_CLAIM_TTL_SECS`], which
    /// covers a dispatcher that died mid-send.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<Reminder>, sqlx::Error> {
        let query = format!(
            "UPDATE reminders SET claimed_at = now()
             WHERE id IN (
                SELECT id FROM reminders
                WHERE status = 'pending'
                  AND scheduled_for <= now()
                  AND (claimed_at IS NULL
                       OR claimed_at < now() - make_interval(secs => {REMINDER_CLAIM_TTL_SECS}))
                ORDER BY scheduled_for ASC, id ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        let mut claimed = sqlx::query_as::<_, Reminder>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        claimed.sort_by_key(|r| (r.scheduled_for, r.id));
        Ok(claimed)
    }

    /// Give a claimed reminder back untouched, leaving it pending.
    pub async fn release_claim(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reminders SET claimed_at = NULL WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful send.
    pub async fn mark_sent(
        pool: &PgPool,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reminders SET
                status              = 'sent',
                sent_at             = now(),
                last_error          = NULL,
                claimed_at          = NULL,
                provider_message_id = $2
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(provider_message_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed send attempt with its computed outcome.
    pub async fn record_failure(
        pool: &PgPool,
        id: DbId,
        outcome: &FailureOutcome,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reminders SET
                status      = $2,
                retry_count = $3,
                last_error  = $4,
                claimed_at  = NULL
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(outcome.status.as_str())
        .bind(outcome.retry_count)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

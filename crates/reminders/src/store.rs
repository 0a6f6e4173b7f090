//! Storage operations the dispatcher needs.

use afya_core::reminders::FailureOutcome;
use afya_core::types::DbId;
use afya_db::models::reminder::Reminder;
use afya_db::models::reminder_provider::ReminderProvider;
use afya_db::repositories::{ReminderProviderRepo, ReminderRepo};
use afya_db::DbPool;

#[async_trait::async_trait]
pub trait ReminderStore: Send + Sync {
    async fn active_providers(&self) -> Result<Vec<ReminderProvider>, sqlx::Error>;

    /// Claim a batch of due reminders for this dispatcher.
    async fn claim_due(&self, limit: i64) -> Result<Vec<Reminder>, sqlx::Error>;

    /// Hand back a claimed reminder without recording an attempt.
    async fn release_claim(&self, id: DbId) -> Result<bool, sqlx::Error>;

    async fn mark_sent(
        &self,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<bool, sqlx::Error>;

    async fn record_failure(
        &self,
        id: DbId,
        outcome: &FailureOutcome,
        error: &str,
    ) -> Result<bool, sqlx::Error>;
}

/// [`ReminderStore`] backed by the Postgres repositories.
#[derive(Debug, Clone)]
pub struct PgReminderStore {
    pool: DbPool,
}

impl PgReminderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReminderStore for PgReminderStore {
    async fn active_providers(&self) -> Result<Vec<ReminderProvider>, sqlx::Error> {
        ReminderProviderRepo::list_active(&self.pool).await
    }

    async fn claim_due(&self, limit: i64) -> Result<Vec<Reminder>, sqlx::Error> {
        ReminderRepo::claim_due(&self.pool, limit).await
    }

    async fn release_claim(&self, id: DbId) -> Result<bool, sqlx::Error> {
        ReminderRepo::release_claim(&self.pool, id).await
    }

    async fn mark_sent(
        &self,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        ReminderRepo::mark_sent(&self.pool, id, provider_message_id).await
    }

    async fn record_failure(
        &self,
        id: DbId,
        outcome: &FailureOutcome,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        ReminderRepo::record_failure(&self.pool, id, outcome, error).await
    }
}

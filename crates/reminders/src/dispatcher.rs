//! Periodic dispatch of due reminders.
//!
//! Each tick loads the active providers, claims a batch of due pending
//! reminders, and sends them one by one. A reminder whose send or
//! bookkeeping fails is logged and skipped; the rest of the batch still
//! goes out. Reminders on a channel without an active provider are handed
//! back pending without spending a retry. Delivery is at-least-once: a
//! crash between a successful send and `mark_sent` leaves the reminder
//! claimed until the claim expires, then it is sent again.

use std::sync::Arc;
use std::time::Duration;

use afya_core::reminders::{
    after_failed_attempt, ReminderChannel, ReminderStatus, DISPATCH_BATCH_SIZE,
};
use afya_db::models::reminder::Reminder;
use tokio_util::sync::CancellationToken;

use crate::registry::ProviderRegistry;
use crate::sender::ReminderSender;
use crate::store::ReminderStore;

/// Default polling interval.
pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_secs(60);

/// Counts for one dispatch tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    /// Failed attempts that stay pending for another try.
    pub retrying: usize,
    /// Failed attempts that exhausted `max_retries`.
    pub failed: usize,
    /// Left pending because no active provider serves their channel.
    pub unrouted: usize,
    /// Reminders whose status could not be written back.
    pub errors: usize,
}

/// Background service that drains due reminders on a fixed interval.
pub struct ReminderDispatcher {
    store: Arc<dyn ReminderStore>,
    sender: Arc<dyn ReminderSender>,
    interval: Duration,
}

impl ReminderDispatcher {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        sender: Arc<dyn ReminderSender>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            interval,
        }
    }

    /// Run the dispatch loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        tracing::info!(interval_secs = self.interval.as_secs(), "Reminder dispatcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reminder dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.dispatch_due().await {
                        Ok(summary) if summary != DispatchSummary::default() => {
                            tracing::info!(
                                sent = summary.sent,
                                retrying = summary.retrying,
                                failed = summary.failed,
                                unrouted = summary.unrouted,
                                errors = summary.errors,
                                "Reminder dispatch tick complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Reminder dispatch tick failed"),
                    }
                }
            }
        }
    }

    /// Send every due reminder in one batch.
    ///
    /// Only loading the providers or the batch can fail the whole tick.
    pub async fn dispatch_due(&self) -> Result<DispatchSummary, sqlx::Error> {
        let registry = ProviderRegistry::from_providers(self.store.active_providers().await?);
        let due = self.store.claim_due(DISPATCH_BATCH_SIZE).await?;

        let mut summary = DispatchSummary::default();
        for reminder in &due {
            match self.dispatch_one(&registry, reminder).await {
                Ok(None) => summary.unrouted += 1,
                Ok(Some(ReminderStatus::Sent)) => summary.sent += 1,
                Ok(Some(ReminderStatus::Failed)) => summary.failed += 1,
                Ok(Some(_)) => summary.retrying += 1,
                Err(e) => {
                    summary.errors += 1;
                    tracing::error!(
                        reminder_id = reminder.id,
                        error = %e,
                        "Failed to record reminder dispatch outcome"
                    );
                }
            }
        }
        Ok(summary)
    }

    /// Attempt one reminder and persist the result.
    ///
    /// Returns the new status, or `None` when no provider serves the channel
    /// and the reminder was handed back untouched.
    async fn dispatch_one(
        &self,
        registry: &ProviderRegistry,
        reminder: &Reminder,
    ) -> Result<Option<ReminderStatus>, sqlx::Error> {
        let provider = ReminderChannel::from_str(&reminder.channel)
            .ok()
            .and_then(|channel| registry.get(channel));
        let Some(provider) = provider else {
            self.store.release_claim(reminder.id).await?;
            tracing::warn!(
                reminder_id = reminder.id,
                channel = %reminder.channel,
                "No active provider for reminder channel; left pending"
            );
            return Ok(None);
        };

        match self.sender.send(provider, reminder).await {
            Ok(receipt) => {
                self.store
                    .mark_sent(reminder.id, receipt.provider_message_id.as_deref())
                    .await?;
                tracing::debug!(
                    reminder_id = reminder.id,
                    channel = %reminder.channel,
                    "Reminder sent"
                );
                Ok(Some(ReminderStatus::Sent))
            }
            Err(e) => {
                let outcome = after_failed_attempt(reminder.retry_count, reminder.max_retries);
                let message = e.to_string();
                self.store
                    .record_failure(reminder.id, &outcome, &message)
                    .await?;
                tracing::warn!(
                    reminder_id = reminder.id,
                    retry_count = outcome.retry_count,
                    status = %outcome.status,
                    error = %message,
                    "Reminder send failed"
                );
                Ok(Some(outcome.status))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use afya_core::reminders::FailureOutcome;
    use afya_core::types::DbId;
    use afya_db::models::reminder_provider::ReminderProvider;
    use chrono::Utc;

    use super::*;
    use crate::sender::{SendError, SendReceipt};

    #[derive(Default)]
    struct FakeStore {
        providers: Vec<ReminderProvider>,
        due: Vec<Reminder>,
        /// Reminder ids whose status write-back fails.
        broken: HashSet<DbId>,
        sent: Mutex<Vec<(DbId, Option<String>)>>,
        failures: Mutex<Vec<(DbId, FailureOutcome, String)>>,
        released: Mutex<Vec<DbId>>,
    }

    #[async_trait::async_trait]
    impl ReminderStore for FakeStore {
        async fn active_providers(&self) -> Result<Vec<ReminderProvider>, sqlx::Error> {
            Ok(self.providers.clone())
        }

        async fn claim_due(&self, limit: i64) -> Result<Vec<Reminder>, sqlx::Error> {
            Ok(self.due.iter().take(limit as usize).cloned().collect())
        }

        async fn release_claim(&self, id: DbId) -> Result<bool, sqlx::Error> {
            self.released.lock().unwrap().push(id);
            Ok(true)
        }

        async fn mark_sent(
            &self,
            id: DbId,
            provider_message_id: Option<&str>,
        ) -> Result<bool, sqlx::Error> {
            if self.broken.contains(&id) {
                return Err(sqlx::Error::PoolTimedOut);
            }
            self.sent
                .lock()
                .unwrap()
                .push((id, provider_message_id.map(str::to_string)));
            Ok(true)
        }

        async fn record_failure(
            &self,
            id: DbId,
            outcome: &FailureOutcome,
            error: &str,
        ) -> Result<bool, sqlx::Error> {
            if self.broken.contains(&id) {
                return Err(sqlx::Error::PoolTimedOut);
            }
            self.failures
                .lock()
                .unwrap()
                .push((id, *outcome, error.to_string()));
            Ok(true)
        }
    }

    /// Fails for recipients listed in `reject`, succeeds otherwise.
    #[derive(Default)]
    struct FakeSender {
        reject: HashSet<String>,
        attempts: Mutex<Vec<DbId>>,
    }

    #[async_trait::async_trait]
    impl ReminderSender for FakeSender {
        async fn send(
            &self,
            _provider: &ReminderProvider,
            reminder: &Reminder,
        ) -> Result<SendReceipt, SendError> {
            self.attempts.lock().unwrap().push(reminder.id);
            if self.reject.contains(&reminder.recipient) {
                return Err(SendError::HttpStatus(503));
            }
            Ok(SendReceipt {
                provider_message_id: Some(format!("msg-{}", reminder.id)),
            })
        }
    }

    fn provider(channel: &str) -> ReminderProvider {
        ReminderProvider {
            id: 1,
            channel: channel.to_string(),
            name: "Test".to_string(),
            endpoint_url: "https://provider.example.com/send".to_string(),
            api_key: None,
            sender_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn reminder(id: DbId, channel: &str, recipient: &str, retry_count: i32) -> Reminder {
        Reminder {
            id,
            patient_ref: format!("P-{id}"),
            recipient: recipient.to_string(),
            channel: channel.to_string(),
            message: "Clinic visit tomorrow".to_string(),
            scheduled_for: Utc::now(),
            status: "pending".to_string(),
            retry_count,
            max_retries: 3,
            last_error: None,
            provider_message_id: None,
            sent_at: None,
            delivered_at: None,
            claimed_at: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dispatcher(store: Arc<FakeStore>, sender: Arc<FakeSender>) -> ReminderDispatcher {
        ReminderDispatcher::new(store, sender, DEFAULT_DISPATCH_INTERVAL)
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let store = Arc::new(FakeStore {
            providers: vec![provider("sms")],
            due: vec![
                reminder(1, "sms", "+254700000001", 0),
                reminder(2, "sms", "+254700000002", 0),
                reminder(3, "sms", "+254700000003", 0),
            ],
            ..Default::default()
        });
        let sender = Arc::new(FakeSender {
            reject: HashSet::from(["+254700000002".to_string()]),
            ..Default::default()
        });

        let summary = dispatcher(store.clone(), sender.clone())
            .dispatch_due()
            .await
            .unwrap();

        assert_eq!(
            summary,
            DispatchSummary {
                sent: 2,
                retrying: 1,
                failed: 0,
                unrouted: 0,
                errors: 0
            }
        );
        assert_eq!(*sender.attempts.lock().unwrap(), vec![1, 2, 3]);
        let sent = store.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![(1, Some("msg-1".into())), (3, Some("msg-3".into()))]);

        let failures = store.failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2);
        assert_eq!(failures[0].1.status, ReminderStatus::Pending);
        assert_eq!(failures[0].1.retry_count, 1);
        assert_eq!(failures[0].2, "Provider returned HTTP 503");
    }

    #[tokio::test]
    async fn last_retry_marks_failed() {
        let store = Arc::new(FakeStore {
            providers: vec![provider("sms")],
            due: vec![reminder(1, "sms", "+254700000001", 2)],
            ..Default::default()
        });
        let sender = Arc::new(FakeSender {
            reject: HashSet::from(["+254700000001".to_string()]),
            ..Default::default()
        });

        let summary = dispatcher(store.clone(), sender).dispatch_due().await.unwrap();

        assert_eq!(summary.failed, 1);
        let failures = store.failures.lock().unwrap().clone();
        assert_eq!(failures[0].1.status, ReminderStatus::Failed);
        assert_eq!(failures[0].1.retry_count, 3);
    }

    #[tokio::test]
    async fn missing_provider_leaves_reminder_pending_without_retry() {
        let store = Arc::new(FakeStore {
            providers: vec![provider("sms")],
            due: vec![
                reminder(1, "voice", "+254700000001", 0),
                reminder(2, "sms", "+254700000002", 0),
            ],
            ..Default::default()
        });
        let sender = Arc::new(FakeSender::default());

        let summary = dispatcher(store.clone(), sender.clone())
            .dispatch_due()
            .await
            .unwrap();

        assert_eq!(summary.unrouted, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.retrying, 0);
        assert_eq!(*sender.attempts.lock().unwrap(), vec![2]);
        assert!(store.failures.lock().unwrap().is_empty());
        assert_eq!(*store.released.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn write_back_error_is_isolated() {
        let store = Arc::new(FakeStore {
            providers: vec![provider("sms")],
            due: vec![
                reminder(1, "sms", "+254700000001", 0),
                reminder(2, "sms", "+254700000002", 0),
            ],
            broken: HashSet::from([1]),
            ..Default::default()
        });
        let sender = Arc::new(FakeSender::default());

        let summary = dispatcher(store.clone(), sender).dispatch_due().await.unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(store.sent.lock().unwrap()[0].0, 2);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let store = Arc::new(FakeStore::default());
        let sender = Arc::new(FakeSender::default());
        let dispatcher = ReminderDispatcher::new(store, sender, Duration::from_millis(10));

        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { dispatcher.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dispatcher should stop promptly")
            .unwrap();
    }
}

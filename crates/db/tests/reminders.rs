//! Reminder and provider repositories against Postgres.

use afya_core::reminders::{after_failed_attempt, ReminderStatus};
use afya_db::models::reminder::{CreateReminder, ReminderFilter, UpdateReminder};
use afya_db::models::reminder_provider::UpsertReminderProvider;
use afya_db::repositories::{ReminderProviderRepo, ReminderRepo};
use chrono::{Duration, Utc};
use sqlx::PgPool;

fn new_reminder(patient_ref: &str) -> CreateReminder {
    CreateReminder {
        patient_ref: patient_ref.to_string(),
        recipient: "+254700000001".to_string(),
        channel: "sms".to_string(),
        message: "Your clinic visit is tomorrow at 9am.".to_string(),
        scheduled_for: None,
        max_retries: None,
        created_by: Some(2),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_defaults(pool: PgPool) {
    let reminder = ReminderRepo::create(&pool, &new_reminder("P-001"))
        .await
        .unwrap();

    assert_eq!(reminder.status, "pending");
    assert_eq!(reminder.retry_count, 0);
    assert_eq!(reminder.max_retries, 3);
    assert!(reminder.scheduled_for <= Utc::now());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_due_reminders_exclude_future_and_non_pending(pool: PgPool) {
    let due = ReminderRepo::create(&pool, &new_reminder("P-001"))
        .await
        .unwrap();

    let mut future = new_reminder("P-002");
    future.scheduled_for = Some(Utc::now() + Duration::hours(2));
    ReminderRepo::create(&pool, &future).await.unwrap();

    let cancelled = ReminderRepo::create(&pool, &new_reminder("P-003"))
        .await
        .unwrap();
    ReminderRepo::cancel(&pool, cancelled.id).await.unwrap();

    let batch = ReminderRepo::claim_due(&pool, 100).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![due.id]);
    assert!(batch[0].claimed_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_claimed_reminders_are_not_claimed_twice(pool: PgPool) {
    let first = ReminderRepo::create(&pool, &new_reminder("P-001"))
        .await
        .unwrap();
    let second = ReminderRepo::create(&pool, &new_reminder("P-002"))
        .await
        .unwrap();

    let dispatcher_a = ReminderRepo::claim_due(&pool, 1).await.unwrap();
    let dispatcher_b = ReminderRepo::claim_due(&pool, 100).await.unwrap();
    assert_eq!(dispatcher_a.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first.id]);
    assert_eq!(dispatcher_b.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id]);
    assert!(ReminderRepo::claim_due(&pool, 100).await.unwrap().is_empty());

    // A recorded retry clears the claim so the next tick picks it up again.
    let outcome = after_failed_attempt(first.retry_count, first.max_retries);
    ReminderRepo::record_failure(&pool, first.id, &outcome, "gateway 502")
        .await
        .unwrap();
    // A released claim is also available again, with no retry spent.
    assert!(ReminderRepo::release_claim(&pool, second.id).await.unwrap());

    let again = ReminderRepo::claim_due(&pool, 100).await.unwrap();
    assert_eq!(again.len(), 2);
    let released = again.iter().find(|r| r.id == second.id).unwrap();
    assert_eq!(released.retry_count, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_claim_is_reclaimed(pool: PgPool) {
    let reminder = ReminderRepo::create(&pool, &new_reminder("P-001"))
        .await
        .unwrap();
    ReminderRepo::claim_due(&pool, 100).await.unwrap();

    sqlx::query("UPDATE reminders SET claimed_at = now() - interval '2 hours' WHERE id = $1")
        .bind(reminder.id)
        .execute(&pool)
        .await
        .unwrap();

    let batch = ReminderRepo::claim_due(&pool, 100).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, reminder.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sent_then_delivered(pool: PgPool) {
    let reminder = ReminderRepo::create(&pool, &new_reminder("P-001"))
        .await
        .unwrap();

    // Delivery receipts for unsent reminders are ignored.
    assert!(ReminderRepo::mark_delivered(&pool, reminder.id, None)
        .await
        .unwrap()
        .is_none());

    ReminderRepo::claim_due(&pool, 100).await.unwrap();
    assert!(ReminderRepo::mark_sent(&pool, reminder.id, Some("msg-1"))
        .await
        .unwrap());
    let delivered = ReminderRepo::mark_delivered(&pool, reminder.id, None)
        .await
        .unwrap()
        .expect("sent reminder should accept a receipt");

    assert_eq!(delivered.status, "delivered");
    assert_eq!(delivered.provider_message_id.as_deref(), Some("msg-1"));
    assert!(delivered.sent_at.is_some());
    assert!(delivered.delivered_at.is_some());
    assert!(delivered.claimed_at.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failures_retry_until_max(pool: PgPool) {
    let mut input = new_reminder("P-001");
    input.max_retries = Some(2);
    let reminder = ReminderRepo::create(&pool, &input).await.unwrap();

    let first = after_failed_attempt(reminder.retry_count, reminder.max_retries);
    assert!(ReminderRepo::record_failure(&pool, reminder.id, &first, "gateway 502")
        .await
        .unwrap());
    let reminder = ReminderRepo::find_by_id(&pool, reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reminder.status, "pending");
    assert_eq!(reminder.retry_count, 1);
    assert_eq!(reminder.last_error.as_deref(), Some("gateway 502"));

    let second = after_failed_attempt(reminder.retry_count, reminder.max_retries);
    assert_eq!(second.status, ReminderStatus::Failed);
    ReminderRepo::record_failure(&pool, reminder.id, &second, "gateway 502")
        .await
        .unwrap();
    let reminder = ReminderRepo::find_by_id(&pool, reminder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reminder.status, "failed");
    assert_eq!(reminder.retry_count, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_only_while_pending(pool: PgPool) {
    let reminder = ReminderRepo::create(&pool, &new_reminder("P-001"))
        .await
        .unwrap();

    let patch = UpdateReminder {
        message: Some("Rescheduled to Friday.".to_string()),
        ..Default::default()
    };
    let updated = ReminderRepo::update_pending(&pool, reminder.id, &patch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.message, "Rescheduled to Friday.");
    assert_eq!(updated.recipient, reminder.recipient);

    ReminderRepo::cancel(&pool, reminder.id).await.unwrap();
    assert!(ReminderRepo::update_pending(&pool, reminder.id, &patch)
        .await
        .unwrap()
        .is_none());

    let filter = ReminderFilter {
        status: Some("cancelled".to_string()),
        ..Default::default()
    };
    assert_eq!(ReminderRepo::list(&pool, &filter).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_provider_upsert_replaces_by_channel(pool: PgPool) {
    let mut input = UpsertReminderProvider {
        name: "Africa's Talking".to_string(),
        endpoint_url: "https://sms.example.com/send".to_string(),
        api_key: Some("k1".to_string()),
        sender_id: Some("AFYA".to_string()),
        is_active: None,
    };
    let first = ReminderProviderRepo::upsert(&pool, "sms", &input)
        .await
        .unwrap();

    input.endpoint_url = "https://sms2.example.com/send".to_string();
    input.is_active = Some(false);
    let second = ReminderProviderRepo::upsert(&pool, "sms", &input)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.endpoint_url, "https://sms2.example.com/send");
    assert_eq!(ReminderProviderRepo::list(&pool).await.unwrap().len(), 1);
    assert!(ReminderProviderRepo::list_active(&pool)
        .await
        .unwrap()
        .is_empty());
}

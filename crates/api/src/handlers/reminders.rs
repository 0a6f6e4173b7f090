//! Handlers for patient reminders and their delivery providers.
//!
//! Sending happens in the background dispatcher; these endpoints schedule,
//! edit, and cancel reminders and accept delivery receipts.

use afya_core::error::CoreError;
use afya_core::integrations::{validate_base_url, validate_name};
use afya_core::reminders::{self, ReminderChannel, ReminderStatus};
use afya_core::types::DbId;
use afya_db::models::reminder::{
    CreateReminder, MarkDelivered, Reminder, ReminderFilter, UpdateReminder,
};
use afya_db::models::reminder_provider::UpsertReminderProvider;
use afya_db::repositories::{ReminderProviderRepo, ReminderRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth, RequireService};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_reminder_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<Reminder> {
    ReminderRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::NotFound { entity: "Reminder", id }))
}

/// Check `current -> next` against the status machine.
fn check_transition(reminder: &Reminder, next: ReminderStatus) -> AppResult<()> {
    let current = ReminderStatus::from_str(&reminder.status)?;
    current.ensure_transition(next)?;
    Ok(())
}

/// The row changed status between the read and the conditional write.
fn lost_race(reminder: &Reminder, next: ReminderStatus) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "Reminder {} changed status before it could move to '{next}'",
        reminder.id
    )))
}

// ---------------------------------------------------------------------------
// POST /reminders
// ---------------------------------------------------------------------------

/// Schedule a reminder. Without `scheduled_for` it is due immediately.
pub async fn create_reminder(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateReminder>,
) -> AppResult<impl IntoResponse> {
    if body.patient_ref.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "patient_ref must not be empty".into(),
        )));
    }
    let channel = ReminderChannel::from_str(&body.channel)?;
    reminders::validate_recipient(channel, &body.recipient)?;
    reminders::validate_message(&body.message)?;
    if let Some(max) = body.max_retries {
        reminders::validate_max_retries(max)?;
    }

    let input = CreateReminder {
        created_by: Some(user.user_id),
        ..body
    };

    let reminder = ReminderRepo::create(&state.pool, &input).await?;

    tracing::info!(
        reminder_id = reminder.id,
        channel = %reminder.channel,
        scheduled_for = %reminder.scheduled_for,
        user_id = user.user_id,
        "Reminder scheduled"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: reminder })))
}

// ---------------------------------------------------------------------------
// GET /reminders
// ---------------------------------------------------------------------------

pub async fn list_reminders(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(filter): Query<ReminderFilter>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref status) = filter.status {
        ReminderStatus::from_str(status)?;
    }
    if let Some(ref channel) = filter.channel {
        ReminderChannel::from_str(channel)?;
    }

    let items = ReminderRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// GET /reminders/{id}
// ---------------------------------------------------------------------------

pub async fn get_reminder(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let reminder = ensure_reminder_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: reminder }))
}

// ---------------------------------------------------------------------------
// PUT /reminders/{id}
// ---------------------------------------------------------------------------

/// Edit a reminder that has not been sent yet.
pub async fn update_reminder(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateReminder>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_reminder_exists(&state.pool, id).await?;
    if existing.status != ReminderStatus::Pending.as_str() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Reminder {id} is '{}' and can no longer be edited",
            existing.status
        ))));
    }

    if let Some(ref recipient) = body.recipient {
        let channel = ReminderChannel::from_str(&existing.channel)?;
        reminders::validate_recipient(channel, recipient)?;
    }
    if let Some(ref message) = body.message {
        reminders::validate_message(message)?;
    }
    if let Some(max) = body.max_retries {
        reminders::validate_max_retries(max)?;
    }

    let reminder = ReminderRepo::update_pending(&state.pool, id, &body)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Reminder {id} left 'pending' before the edit was applied"
            )))
        })?;

    tracing::info!(reminder_id = id, user_id = user.user_id, "Reminder updated");

    Ok(Json(DataResponse { data: reminder }))
}

// ---------------------------------------------------------------------------
// POST /reminders/{id}/cancel
// ---------------------------------------------------------------------------

pub async fn cancel_reminder(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_reminder_exists(&state.pool, id).await?;
    check_transition(&existing, ReminderStatus::Cancelled)?;

    let reminder = ReminderRepo::cancel(&state.pool, id)
        .await?
        .ok_or_else(|| lost_race(&existing, ReminderStatus::Cancelled))?;

    tracing::info!(reminder_id = id, user_id = user.user_id, "Reminder cancelled");

    Ok(Json(DataResponse { data: reminder }))
}

// ---------------------------------------------------------------------------
// POST /reminders/{id}/delivered
// ---------------------------------------------------------------------------

/// Delivery receipt from a provider: `sent -> delivered`.
pub async fn mark_delivered(
    State(state): State<AppState>,
    RequireService(caller): RequireService,
    Path(id): Path<DbId>,
    Json(body): Json<MarkDelivered>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_reminder_exists(&state.pool, id).await?;
    check_transition(&existing, ReminderStatus::Delivered)?;

    let reminder =
        ReminderRepo::mark_delivered(&state.pool, id, body.provider_message_id.as_deref())
            .await?
            .ok_or_else(|| lost_race(&existing, ReminderStatus::Delivered))?;

    tracing::info!(reminder_id = id, user_id = caller.user_id, "Reminder delivered");

    Ok(Json(DataResponse { data: reminder }))
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// GET /reminders/providers
pub async fn list_providers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<impl IntoResponse> {
    let providers = ReminderProviderRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: providers }))
}

/// PUT /reminders/providers/{channel}
///
/// Creates or replaces the provider for a channel. Picked up by the
/// dispatcher on its next tick.
pub async fn upsert_provider(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(channel): Path<String>,
    Json(body): Json<UpsertReminderProvider>,
) -> AppResult<impl IntoResponse> {
    let channel = ReminderChannel::from_str(&channel)?;
    validate_name("name", &body.name)?;
    validate_base_url(&body.endpoint_url)?;

    let provider = ReminderProviderRepo::upsert(&state.pool, channel.as_str(), &body).await?;

    tracing::info!(
        provider_id = provider.id,
        channel = %channel,
        is_active = provider.is_active,
        user_id = admin.user_id,
        "Reminder provider saved"
    );

    Ok(Json(DataResponse { data: provider }))
}

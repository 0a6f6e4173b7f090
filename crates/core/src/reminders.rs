//! Patient reminder channels, status machine, and retry accounting.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Send attempts allowed before a reminder is marked failed.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Upper bound for a configurable `max_retries`.
pub const MAX_RETRIES_LIMIT: i32 = 10;

/// Longest message accepted (ten concatenated SMS segments).
pub const MAX_MESSAGE_LENGTH: usize = 1600;

/// Reminders claimed per dispatch tick.
pub const DISPATCH_BATCH_SIZE: i64 = 100;

/// Age after which an unrecorded claim is abandoned and the reminder can be
/// claimed again. Exceeds a full batch of sends at the sender timeout.
pub const REMINDER_CLAIM_TTL_SECS: i64 = 1800;

// ---------------------------------------------------------------------------
// ReminderChannel
// ---------------------------------------------------------------------------

/// Delivery channel of a reminder. Each channel has at most one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    Sms,
    Whatsapp,
    Voice,
    Email,
}

impl ReminderChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
            Self::Voice => "voice",
            Self::Email => "email",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::Whatsapp),
            "voice" => Ok(Self::Voice),
            "email" => Ok(Self::Email),
            _ => Err(CoreError::Validation(format!(
                "Invalid channel: '{s}'. Must be one of: sms, whatsapp, voice, email"
            ))),
        }
    }
}

impl std::fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReminderStatus
// ---------------------------------------------------------------------------

/// Delivery status of a reminder.
///
/// ```text
/// pending -> sent -> delivered
///    |        \
///    |         -> failed
///    +-> failed
///    +-> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!(
                "Invalid reminder status: '{s}'. Must be one of: pending, sent, delivered, \
                 failed, cancelled"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: ReminderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Sent)
                | (Self::Pending, Self::Failed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Sent, Self::Delivered)
                | (Self::Sent, Self::Failed)
        )
    }

    /// Return a `Conflict` error unless `self -> next` is allowed.
    pub fn ensure_transition(&self, next: ReminderStatus) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Reminder cannot move from '{self}' to '{next}'"
            )))
        }
    }
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Retry accounting
// ---------------------------------------------------------------------------

/// State a reminder moves to after a failed send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub status: ReminderStatus,
    pub retry_count: i32,
}

/// Count a failed attempt. The reminder stays `pending` (and is picked up
/// again on the next tick) until `max_retries` attempts have failed.
pub fn after_failed_attempt(retry_count: i32, max_retries: i32) -> FailureOutcome {
    let retry_count = retry_count + 1;
    let status = if retry_count >= max_retries {
        ReminderStatus::Failed
    } else {
        ReminderStatus::Pending
    };
    FailureOutcome {
        status,
        retry_count,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_message(message: &str) -> Result<(), CoreError> {
    if message.trim().is_empty() {
        return Err(CoreError::Validation("message must not be empty".into()));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(CoreError::Validation(format!(
            "message must be at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_max_retries(max_retries: i32) -> Result<(), CoreError> {
    if !(1..=MAX_RETRIES_LIMIT).contains(&max_retries) {
        return Err(CoreError::Validation(format!(
            "max_retries must be between 1 and {MAX_RETRIES_LIMIT}, got {max_retries}"
        )));
    }
    Ok(())
}

/// Validate a recipient address for the given channel.
///
/// Phone channels accept an optional leading `+` followed by 7 to 15 digits;
/// email needs a local part and a dotted domain.
pub fn validate_recipient(channel: ReminderChannel, recipient: &str) -> Result<(), CoreError> {
    let recipient = recipient.trim();
    let ok = match channel {
        ReminderChannel::Sms | ReminderChannel::Whatsapp | ReminderChannel::Voice => {
            let digits = recipient.strip_prefix('+').unwrap_or(recipient);
            (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        }
        ReminderChannel::Email => match recipient.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        },
    };

    if ok {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid recipient '{recipient}' for channel {channel}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

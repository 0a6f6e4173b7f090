//! Delivery of a single reminder through its channel's provider.
//!
//! [`HttpReminderSender`] POSTs a JSON payload to the provider's endpoint:
//!
//! ```json
//! { "to": "+254700000001", "message": "...", "channel": "sms", "sender_id": "AFYA" }
//! ```
//!
//! A non-2xx response is a failed attempt. Retrying is the dispatcher's job.

use std::time::Duration;

use afya_db::models::reminder::Reminder;
use afya_db::models::reminder_provider::ReminderProvider;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error / receipt
// ---------------------------------------------------------------------------

/// Error type for reminder delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider returned HTTP {0}")]
    HttpStatus(u16),
}

/// What the provider told us about an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    pub provider_message_id: Option<String>,
}

/// Sends one reminder through one provider.
#[async_trait::async_trait]
pub trait ReminderSender: Send + Sync {
    async fn send(
        &self,
        provider: &ReminderProvider,
        reminder: &Reminder,
    ) -> Result<SendReceipt, SendError>;
}

// ---------------------------------------------------------------------------
// HttpReminderSender
// ---------------------------------------------------------------------------

/// Generic JSON-over-HTTP provider client.
pub struct HttpReminderSender {
    client: reqwest::Client,
}

impl HttpReminderSender {
    /// Create a sender with a pre-configured HTTP client.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ReminderSender for HttpReminderSender {
    async fn send(
        &self,
        provider: &ReminderProvider,
        reminder: &Reminder,
    ) -> Result<SendReceipt, SendError> {
        let payload = serde_json::json!({
            "to": reminder.recipient,
            "message": reminder.message,
            "channel": reminder.channel,
            "sender_id": provider.sender_id,
        });

        let mut request = self.client.post(&provider.endpoint_url).json(&payload);
        if let Some(ref key) = provider.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SendError::HttpStatus(response.status().as_u16()));
        }

        // Providers differ in how they name the message id; the body is optional.
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let provider_message_id = ["message_id", "messageId", "id"]
            .iter()
            .find_map(|field| body.get(*field))
            .and_then(|id| match id {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(SendReceipt {
            provider_message_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Active provider per reminder channel.

use std::collections::HashMap;

use afya_core::reminders::ReminderChannel;
use afya_db::models::reminder_provider::ReminderProvider;

/// Snapshot of the active providers, keyed by channel.
///
/// Built fresh from storage for every dispatch tick, so provider changes
/// take effect on the next tick without a restart.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ReminderChannel, ReminderProvider>,
}

impl ProviderRegistry {
    /// Index providers by channel. Inactive rows and unknown channels are
    /// skipped.
    pub fn from_providers(providers: Vec<ReminderProvider>) -> Self {
        let mut map = HashMap::new();
        for provider in providers.into_iter().filter(|p| p.is_active) {
            match ReminderChannel::from_str(&provider.channel) {
                Ok(channel) => {
                    map.insert(channel, provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = provider.id,
                        error = %e,
                        "Skipping reminder provider"
                    );
                }
            }
        }
        Self { providers: map }
    }

    pub fn get(&self, channel: ReminderChannel) -> Option<&ReminderProvider> {
        self.providers.get(&channel)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn provider(id: i64, channel: &str, is_active: bool) -> ReminderProvider {
        ReminderProvider {
            id,
            channel: channel.to_string(),
            name: format!("provider-{id}"),
            endpoint_url: "https://sms.example.com/send".to_string(),
            api_key: None,
            sender_id: None,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn indexes_active_known_channels() {
        let registry = ProviderRegistry::from_providers(vec![
            provider(1, "sms", true),
            provider(2, "email", false),
            provider(3, "pigeon", true),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ReminderChannel::Sms).map(|p| p.id), Some(1));
        assert!(registry.get(ReminderChannel::Email).is_none());
    }
}

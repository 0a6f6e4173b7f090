//! Outbound patient reminders: provider lookup, delivery, and the periodic
//! dispatcher that drains due reminders.

pub mod dispatcher;
pub mod registry;
pub mod sender;
pub mod store;

pub use dispatcher::{DispatchSummary, ReminderDispatcher};
pub use registry::ProviderRegistry;
pub use sender::{HttpReminderSender, ReminderSender, SendError, SendReceipt};
pub use store::{PgReminderStore, ReminderStore};

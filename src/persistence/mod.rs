//! Durable actor state and reminders.
//!
//! Two independent contracts live here: [`state_store`] persists an
//! actor's own state blob with optimistic concurrency, and
//! [`reminders`] persists durable, at-least-once scheduled callbacks
//! that survive activation restarts and silo crashes.

pub mod error;
pub mod reminders;
pub mod state_store;

pub use error::{ReminderError, StateStoreError};
pub use reminders::{InMemoryReminderStore, Reminder, ReminderStore};
pub use state_store::{InMemoryStateStore, StateKey, StateRecord, StateStore, StateVersion};

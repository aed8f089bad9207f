//! `ReminderStore` trait and the in-memory reference implementation.
//!
//! Reminders are durable, at-least-once scheduled callbacks: once
//! registered, a reminder survives activation restarts and silo
//! crashes, firing within `Period + leeway` of its due time even if
//! the silo that originally scheduled it never comes back.

// Layer 1: Standard library imports
use std::collections::BTreeMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

// Layer 3: Internal module imports
use crate::persistence::error::ReminderError;
use crate::util::{ActorId, ActorKey, ActorType};

/// A durable, named, per-actor scheduled callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// The actor this reminder is registered against.
    pub key: ActorKey,
    /// The reminder's name, unique within one actor's set of reminders.
    pub name: String,
    /// The next time this reminder is due to fire.
    pub next_fire_time: DateTime<Utc>,
    /// `Some(period)` for a recurring reminder, `None` for one-shot.
    pub period: Option<Duration>,
    /// Opaque payload delivered to `OnReminder` when it fires.
    pub payload: Bytes,
}

/// Ordering key used for fairness: due time first, then
/// `(ActorType, ActorId, name)` to break ties deterministically when
/// two reminders share the same due time.
type OrderKey = (DateTime<Utc>, ActorType, ActorId, String);

fn order_key(reminder: &Reminder) -> OrderKey {
    (
        reminder.next_fire_time,
        reminder.key.actor_type.clone(),
        reminder.key.actor_id.clone(),
        reminder.name.clone(),
    )
}

/// Durable reminder scheduling contract.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Register (or replace) a reminder.
    async fn register(&self, reminder: Reminder) -> Result<(), ReminderError>;

    /// Remove a previously registered reminder.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::NotFound`] if no such reminder exists.
    async fn unregister(&self, key: &ActorKey, name: &str) -> Result<(), ReminderError>;

    /// List every reminder registered for `key`.
    async fn list_by_actor(&self, key: &ActorKey) -> Vec<Reminder>;

    /// Select reminders due at or before `now + leeway`, in fairness order.
    async fn select_due(&self, now: DateTime<Utc>, leeway: Duration) -> Vec<Reminder>;

    /// Advance a recurring reminder's next fire time after it has fired.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::NotFound`] if no such reminder exists.
    async fn reschedule(
        &self,
        key: &ActorKey,
        name: &str,
        next_fire_time: DateTime<Utc>,
    ) -> Result<(), ReminderError>;
}

/// `BTreeMap`-backed reference `ReminderStore`.
///
/// Reminders are indexed by `(NextFireTime, ActorType, ActorId, Name)`
/// so that iterating the map in key order directly yields the
/// fairness ordering the poller needs — earliest due time first, ties
/// broken lexicographically.
#[derive(Default)]
pub struct InMemoryReminderStore {
    by_order: RwLock<BTreeMap<OrderKey, Reminder>>,
}

impl InMemoryReminderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn find_order_key(
        map: &BTreeMap<OrderKey, Reminder>,
        key: &ActorKey,
        name: &str,
    ) -> Option<OrderKey> {
        map.iter()
            .find(|(_, reminder)| &reminder.key == key && reminder.name == name)
            .map(|(order, _)| order.clone())
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn register(&self, reminder: Reminder) -> Result<(), ReminderError> {
        if let Some(period) = reminder.period {
            if period.is_zero() {
                return Err(ReminderError::InvalidPeriod {
                    name: reminder.name,
                });
            }
        }
        let mut map = self.by_order.write();
        if let Some(existing) = Self::find_order_key(&map, &reminder.key, &reminder.name) {
            map.remove(&existing);
        }
        map.insert(order_key(&reminder), reminder);
        Ok(())
    }

    async fn unregister(&self, key: &ActorKey, name: &str) -> Result<(), ReminderError> {
        let mut map = self.by_order.write();
        let order = Self::find_order_key(&map, key, name).ok_or_else(|| ReminderError::NotFound {
            key: key.clone(),
            name: name.to_string(),
        })?;
        map.remove(&order);
        Ok(())
    }

    async fn list_by_actor(&self, key: &ActorKey) -> Vec<Reminder> {
        self.by_order
            .read()
            .values()
            .filter(|r| &r.key == key)
            .cloned()
            .collect()
    }

    async fn select_due(&self, now: DateTime<Utc>, leeway: Duration) -> Vec<Reminder> {
        #[allow(clippy::unwrap_used)]
        let cutoff = now + chrono::Duration::from_std(leeway).unwrap_or(chrono::Duration::zero());
        self.by_order
            .read()
            .iter()
            .take_while(|(order, _)| order.0 <= cutoff)
            .map(|(_, reminder)| reminder.clone())
            .collect()
    }

    async fn reschedule(
        &self,
        key: &ActorKey,
        name: &str,
        next_fire_time: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        let mut map = self.by_order.write();
        let order = Self::find_order_key(&map, key, name).ok_or_else(|| ReminderError::NotFound {
            key: key.clone(),
            name: name.to_string(),
        })?;
        #[allow(clippy::unwrap_used)]
        let mut reminder = map.remove(&order).unwrap();
        reminder.next_fire_time = next_fire_time;
        map.insert(order_key(&reminder), reminder);
        Ok(())
    }
}

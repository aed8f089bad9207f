//! `ActorHost`: the capability an activation uses to reach durable state
//! and reminders, scoped to its own `(ActorType, ActorId)`.
//!
//! `ActorContext` carries an optional `Arc<dyn ActorHost>` rather than a
//! generic parameter over the concrete state/reminder store types: the
//! context is already generic over `M`/`B`, and a deployment's actors
//! share one runtime's providers regardless of which message type each
//! actor happens to use, so a third and fourth generic parameter would
//! only duplicate what `Arc<dyn ActorHost>` already expresses — the same
//! trade [`crate::proxy::dispatch::MethodTable`] makes for per-type
//! method dispatch.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use crate::persistence::{Reminder, ReminderError, ReminderStore, StateKey, StateStore, StateStoreError, StateVersion};
use crate::util::ActorKey;

/// Per-activation access to this actor's own durable state slots and
/// reminder schedule.
///
/// A [`crate::system::QuarkRuntime`] builds one of these per activation,
/// closing over the activation's `(ActorType, ActorId)` key so handlers
/// never have to pass it themselves — matching `loadState`/`saveState`/
/// `deleteState`/`registerReminder` in the host-facing API.
#[async_trait]
pub trait ActorHost: Send + Sync {
    /// Load the current record for `slot`, if one has been saved.
    async fn load_state(&self, slot: &str) -> Result<Option<(Bytes, StateVersion)>, StateStoreError>;

    /// Persist `payload` for `slot`, guarded by `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::ConcurrencyViolation`] if the stored
    /// version has advanced past `expected_version`.
    async fn save_state(
        &self,
        slot: &str,
        payload: Bytes,
        expected_version: Option<StateVersion>,
    ) -> Result<StateVersion, StateStoreError>;

    /// Delete the record for `slot`, guarded by `expected_version`.
    async fn delete_state(&self, slot: &str, expected_version: StateVersion) -> Result<(), StateStoreError>;

    /// Register (or replace) a durable, at-least-once reminder named
    /// `name`, first due at `due_time` and repeating every `period` (or
    /// one-shot if `None`).
    async fn register_reminder(
        &self,
        name: &str,
        due_time: DateTime<Utc>,
        period: Option<Duration>,
        payload: Bytes,
    ) -> Result<(), ReminderError>;

    /// Cancel a previously registered reminder.
    async fn unregister_reminder(&self, name: &str) -> Result<(), ReminderError>;
}

/// [`ActorHost`] for activations spawned without a runtime (bare
/// `ActorSystem` usage, or unit tests): every call fails with a
/// backend error naming the missing capability, rather than silently
/// discarding the attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredHost;

#[async_trait]
impl ActorHost for UnconfiguredHost {
    async fn load_state(&self, _slot: &str) -> Result<Option<(Bytes, StateVersion)>, StateStoreError> {
        Err(StateStoreError::Backend(
            "no ActorHost configured for this activation; spawn through QuarkRuntime".to_string(),
        ))
    }

    async fn save_state(
        &self,
        _slot: &str,
        _payload: Bytes,
        _expected_version: Option<StateVersion>,
    ) -> Result<StateVersion, StateStoreError> {
        Err(StateStoreError::Backend(
            "no ActorHost configured for this activation; spawn through QuarkRuntime".to_string(),
        ))
    }

    async fn delete_state(&self, _slot: &str, _expected_version: StateVersion) -> Result<(), StateStoreError> {
        Err(StateStoreError::Backend(
            "no ActorHost configured for this activation; spawn through QuarkRuntime".to_string(),
        ))
    }

    async fn register_reminder(
        &self,
        name: &str,
        _due_time: DateTime<Utc>,
        _period: Option<Duration>,
        _payload: Bytes,
    ) -> Result<(), ReminderError> {
        Err(ReminderError::InvalidPeriod {
            name: name.to_string(),
        })
    }

    async fn unregister_reminder(&self, name: &str) -> Result<(), ReminderError> {
        Err(ReminderError::NotFound {
            key: crate::util::ActorKey::new(
                #[allow(clippy::unwrap_used)]
                crate::util::ActorType::new("unconfigured").unwrap(),
                #[allow(clippy::unwrap_used)]
                crate::util::ActorId::new("unconfigured").unwrap(),
            ),
            name: name.to_string(),
        })
    }
}

/// [`ActorHost`] backed by a real [`StateStore`]/[`ReminderStore`] pair,
/// closed over one activation's [`ActorKey`].
///
/// A [`crate::system::QuarkRuntime`] constructs one of these per
/// activation it spawns (see [`crate::system::QuarkRuntime::host_for`])
/// and attaches it to that activation's [`crate::actor::ActorContext`]
/// via [`crate::actor::ActorContext::with_host`], so `load_state`/
/// `save_state`/`register_reminder` reach the runtime's providers
/// without a handler ever touching them directly.
pub struct QuarkActorHost<St, Re> {
    key: ActorKey,
    state_store: std::sync::Arc<St>,
    reminders: std::sync::Arc<Re>,
}

impl<St, Re> QuarkActorHost<St, Re>
where
    St: StateStore,
    Re: ReminderStore,
{
    /// Build a host scoped to `key`, backed by `state_store`/`reminders`.
    pub fn new(key: ActorKey, state_store: std::sync::Arc<St>, reminders: std::sync::Arc<Re>) -> Self {
        Self {
            key,
            state_store,
            reminders,
        }
    }
}

#[async_trait]
impl<St, Re> ActorHost for QuarkActorHost<St, Re>
where
    St: StateStore + Send + Sync,
    Re: ReminderStore + Send + Sync,
{
    async fn load_state(&self, slot: &str) -> Result<Option<(Bytes, StateVersion)>, StateStoreError> {
        let key = StateKey::new(self.key.clone(), slot.to_string());
        Ok(self
            .state_store
            .load(&key)
            .await?
            .map(|record| (record.data, record.version)))
    }

    async fn save_state(
        &self,
        slot: &str,
        payload: Bytes,
        expected_version: Option<StateVersion>,
    ) -> Result<StateVersion, StateStoreError> {
        let key = StateKey::new(self.key.clone(), slot.to_string());
        self.state_store.save(&key, payload, expected_version).await
    }

    async fn delete_state(&self, slot: &str, expected_version: StateVersion) -> Result<(), StateStoreError> {
        let key = StateKey::new(self.key.clone(), slot.to_string());
        self.state_store.delete(&key, expected_version).await
    }

    async fn register_reminder(
        &self,
        name: &str,
        due_time: DateTime<Utc>,
        period: Option<Duration>,
        payload: Bytes,
    ) -> Result<(), ReminderError> {
        self.reminders
            .register(Reminder {
                key: self.key.clone(),
                name: name.to_string(),
                next_fire_time: due_time,
                period,
                payload,
            })
            .await
    }

    async fn unregister_reminder(&self, name: &str) -> Result<(), ReminderError> {
        self.reminders.unregister(&self.key, name).await
    }
}

//! `StateStore` trait and the in-memory reference implementation.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::persistence::error::StateStoreError;
use crate::util::ActorKey;

/// A state record's storage key: an actor key plus the named partition
/// ("slot") within that actor's state, per the `{actorType}/{actorId}/{slot}`
/// layout an actor's `loadState`/`saveState`/`deleteState` calls address.
///
/// An actor with more than one independently-versioned piece of state
/// (say, a `"profile"` slot and a `"preferences"` slot) saves each under
/// its own `StateKey` rather than serializing everything into one blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    /// The actor this state belongs to.
    pub actor: ActorKey,
    /// The slot name within that actor's state.
    pub slot: String,
}

impl StateKey {
    /// Build a key for `slot` within `actor`'s state.
    pub fn new(actor: ActorKey, slot: impl Into<String>) -> Self {
        Self {
            actor,
            slot: slot.into(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor, self.slot)
    }
}

/// Monotonically increasing version attached to every state record.
///
/// Unlike [`crate::directory::Version`], callers pass `None` to mean
/// "I believe no record exists yet" rather than an initial sentinel
/// value, since state is written by the owning actor itself (which
/// always has the version it last loaded, or nothing on first activation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateVersion(pub u64);

impl StateVersion {
    /// The version assigned to the first saved record for a key.
    pub const INITIAL: StateVersion = StateVersion(1);

    /// The next version after this one.
    pub fn next(self) -> Self {
        StateVersion(self.0 + 1)
    }
}

impl fmt::Display for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A loaded state record: the opaque payload plus its version and the
/// time it was last written.
#[derive(Debug, Clone)]
pub struct StateRecord {
    /// The actor's serialized state, opaque to the store.
    pub data: Bytes,
    /// The record's current version.
    pub version: StateVersion,
    /// When this version was written.
    pub updated_at: DateTime<Utc>,
}

/// Optimistic-concurrency persistent store for actor state.
///
/// Every write is guarded by the version the caller last observed (or
/// `None` for a brand-new activation), so two concurrent activations
/// of the same logical actor on different silos cannot silently
/// overwrite each other's state — the loser's `save` fails with
/// [`StateStoreError::ConcurrencyViolation`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the current state record for `key`, if one exists.
    async fn load(&self, key: &StateKey) -> Result<Option<StateRecord>, StateStoreError>;

    /// Persist `data` for `key`, guarded by `expected_version`.
    ///
    /// `expected_version` must be `None` if the caller believes no
    /// record exists yet, or `Some` of the version it last loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::ConcurrencyViolation`] if the stored
    /// version does not match `expected_version`.
    async fn save(
        &self,
        key: &StateKey,
        data: Bytes,
        expected_version: Option<StateVersion>,
    ) -> Result<StateVersion, StateStoreError>;

    /// Delete the state record for `key`, guarded by `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::NotFound`] if no record exists, or
    /// [`StateStoreError::ConcurrencyViolation`] if the stored version
    /// does not match `expected_version`.
    async fn delete(
        &self,
        key: &StateKey,
        expected_version: StateVersion,
    ) -> Result<(), StateStoreError>;
}

/// DashMap-backed reference `StateStore`.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    records: DashMap<StateKey, StateRecord>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, key: &StateKey) -> Result<Option<StateRecord>, StateStoreError> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(
        &self,
        key: &StateKey,
        data: Bytes,
        expected_version: Option<StateVersion>,
    ) -> Result<StateVersion, StateStoreError> {
        let current = self.records.get(key).map(|entry| entry.value().version);
        if current != expected_version {
            let found = current.unwrap_or(StateVersion(0));
            let expected = expected_version.unwrap_or(StateVersion(0));
            return Err(StateStoreError::ConcurrencyViolation {
                key: key.clone(),
                expected,
                found,
            });
        }
        let next_version = current.map_or(StateVersion::INITIAL, StateVersion::next);
        self.records.insert(
            key.clone(),
            StateRecord {
                data,
                version: next_version,
                updated_at: Utc::now(),
            },
        );
        Ok(next_version)
    }

    async fn delete(
        &self,
        key: &StateKey,
        expected_version: StateVersion,
    ) -> Result<(), StateStoreError> {
        let current = self
            .records
            .get(key)
            .map(|entry| entry.value().version)
            .ok_or_else(|| StateStoreError::NotFound(key.clone()))?;
        if current != expected_version {
            return Err(StateStoreError::ConcurrencyViolation {
                key: key.clone(),
                expected: expected_version,
                found: current,
            });
        }
        self.records.remove(key);
        Ok(())
    }
}

//! Persistence error types: state store and reminder store.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::persistence::state_store::{StateKey, StateVersion};
use crate::util::ActorKey;

/// Errors raised by [`crate::persistence::StateStore`] operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// `Save`/`Delete` supplied a version that no longer matches the
    /// record currently stored for this key.
    #[error("concurrency violation for {key}: expected {expected}, found {found}")]
    ConcurrencyViolation {
        /// The state key whose record was being written.
        key: StateKey,
        /// The version the caller expected to be current.
        expected: StateVersion,
        /// The version actually stored.
        found: StateVersion,
    },

    /// `Delete` (or a version-guarded `Save`) targeted a key with no
    /// existing record.
    #[error("no state record for {0}")]
    NotFound(StateKey),

    /// The underlying storage backend failed.
    #[error("state store backend error: {0}")]
    Backend(String),
}

/// Errors raised by [`crate::persistence::ReminderStore`] operations.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// `unregister` referenced a reminder that does not exist.
    #[error("no reminder named {name} for {key}")]
    NotFound {
        /// The actor the reminder was registered against.
        key: ActorKey,
        /// The reminder's name.
        name: String,
    },

    /// A reminder's period was zero or negative.
    #[error("invalid reminder period for {name}")]
    InvalidPeriod {
        /// The reminder's name.
        name: String,
    },
}

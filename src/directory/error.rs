//! Directory error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::directory::traits::Version;
use crate::util::ActorKey;

/// Errors raised by [`crate::directory::Directory`] operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// `put_if_absent` found an existing entry for the key.
    #[error("actor already placed: {0}")]
    AlreadyPlaced(ActorKey),

    /// A CAS-guarded write supplied a version that no longer matches.
    #[error("version conflict for {key}: expected {expected}, found {found}")]
    VersionConflict {
        /// The actor key whose entry was being updated.
        key: ActorKey,
        /// The version the caller expected to be current.
        expected: Version,
        /// The version actually stored.
        found: Version,
    },

    /// Operation referenced a key with no directory entry.
    #[error("no placement found for {0}")]
    NotFound(ActorKey),
}

//! `Directory` trait and its supporting record types.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::directory::error::DirectoryError;
use crate::util::{ActorKey, SiloId};

/// Monotonically increasing version attached to every directory entry.
///
/// Each successful write increments the version by one; readers use the
/// version to detect concurrent placement changes without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub u64);

impl Version {
    /// The version assigned to the first placement of a key.
    pub const INITIAL: Version = Version(1);

    /// The next version after this one.
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One directory record: where an actor is placed, and since when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// The silo currently hosting this actor's activation.
    pub silo_id: SiloId,
    /// The entry's version, incremented on every successful write.
    pub version: Version,
}

/// Cluster-wide `(ActorType, ActorId) -> SiloId` placement map.
///
/// All mutating operations are compare-and-set: callers supply the
/// version they last observed, and the write only succeeds if the
/// stored version still matches. This is what prevents two silos from
/// both believing they host the same actor after a concurrent
/// placement race.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up the current placement for `key`, if any.
    async fn get(&self, key: &ActorKey) -> Option<DirectoryEntry>;

    /// Place `key` on `silo_id`, but only if no entry currently exists.
    ///
    /// Returns the newly created entry (always at [`Version::INITIAL`]).
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyPlaced`] if an entry already exists.
    async fn put_if_absent(
        &self,
        key: ActorKey,
        silo_id: SiloId,
    ) -> Result<DirectoryEntry, DirectoryError>;

    /// Re-place `key` onto `new_silo_id`, but only if the stored version
    /// still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] if no entry exists, or
    /// [`DirectoryError::VersionConflict`] if the stored version has moved on.
    async fn replace_if_version(
        &self,
        key: &ActorKey,
        expected_version: Version,
        new_silo_id: SiloId,
    ) -> Result<DirectoryEntry, DirectoryError>;

    /// Remove the placement for `key`, but only if the stored version
    /// still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] if no entry exists, or
    /// [`DirectoryError::VersionConflict`] if the stored version has moved on.
    async fn delete_if_version(
        &self,
        key: &ActorKey,
        expected_version: Version,
    ) -> Result<(), DirectoryError>;

    /// List all actors currently placed on `silo_id`.
    async fn list_by_silo(&self, silo_id: &SiloId) -> Vec<ActorKey>;
}

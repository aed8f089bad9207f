//! DashMap-backed reference `Directory`.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::directory::error::DirectoryError;
use crate::directory::traits::{Directory, DirectoryEntry, Version};
use crate::util::{ActorKey, SiloId};

/// In-memory `Directory` implementation, keyed by [`ActorKey`].
///
/// Mirrors the layering style of [`crate::broker::registry::ActorRegistry`]:
/// a single `DashMap` gives lock-free concurrent reads, and each entry's
/// `Version` makes every write a compare-and-set rather than a blind
/// overwrite.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: DashMap<ActorKey, DirectoryEntry>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn get(&self, key: &ActorKey) -> Option<DirectoryEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn put_if_absent(
        &self,
        key: ActorKey,
        silo_id: SiloId,
    ) -> Result<DirectoryEntry, DirectoryError> {
        match self.entries.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DirectoryError::AlreadyPlaced(key)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let entry = DirectoryEntry {
                    silo_id,
                    version: Version::INITIAL,
                };
                slot.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    async fn replace_if_version(
        &self,
        key: &ActorKey,
        expected_version: Version,
        new_silo_id: SiloId,
    ) -> Result<DirectoryEntry, DirectoryError> {
        let mut slot = self
            .entries
            .get_mut(key)
            .ok_or_else(|| DirectoryError::NotFound(key.clone()))?;
        if slot.version != expected_version {
            return Err(DirectoryError::VersionConflict {
                key: key.clone(),
                expected: expected_version,
                found: slot.version,
            });
        }
        slot.silo_id = new_silo_id;
        slot.version = slot.version.next();
        Ok(slot.clone())
    }

    async fn delete_if_version(
        &self,
        key: &ActorKey,
        expected_version: Version,
    ) -> Result<(), DirectoryError> {
        let current = self
            .entries
            .get(key)
            .ok_or_else(|| DirectoryError::NotFound(key.clone()))?
            .version;
        if current != expected_version {
            return Err(DirectoryError::VersionConflict {
                key: key.clone(),
                expected: expected_version,
                found: current,
            });
        }
        self.entries.remove(key);
        Ok(())
    }

    async fn list_by_silo(&self, silo_id: &SiloId) -> Vec<ActorKey> {
        self.entries
            .iter()
            .filter(|entry| &entry.value().silo_id == silo_id)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{ActorId, ActorType};

    fn key(t: &str, id: &str) -> ActorKey {
        #[allow(clippy::unwrap_used)]
        ActorKey::new(ActorType::new(t).unwrap(), ActorId::new(id).unwrap())
    }

    fn silo(name: &str) -> SiloId {
        #[allow(clippy::unwrap_used)]
        SiloId::new(name).unwrap()
    }

    #[tokio::test]
    async fn put_if_absent_succeeds_once() {
        let dir = InMemoryDirectory::new();
        let entry = dir
            .put_if_absent(key("counter", "c1"), silo("silo-a"))
            .await
            .unwrap();
        assert_eq!(entry.version, Version::INITIAL);

        let err = dir
            .put_if_absent(key("counter", "c1"), silo("silo-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::AlreadyPlaced(_)));
    }

    #[tokio::test]
    async fn get_returns_current_placement() {
        let dir = InMemoryDirectory::new();
        dir.put_if_absent(key("counter", "c1"), silo("silo-a"))
            .await
            .unwrap();
        let entry = dir.get(&key("counter", "c1")).await.unwrap();
        assert_eq!(entry.silo_id, silo("silo-a"));
    }

    #[tokio::test]
    async fn replace_if_version_rejects_stale_version() {
        let dir = InMemoryDirectory::new();
        dir.put_if_absent(key("counter", "c1"), silo("silo-a"))
            .await
            .unwrap();

        let err = dir
            .replace_if_version(&key("counter", "c1"), Version(99), silo("silo-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn replace_if_version_succeeds_and_bumps_version() {
        let dir = InMemoryDirectory::new();
        dir.put_if_absent(key("counter", "c1"), silo("silo-a"))
            .await
            .unwrap();

        let updated = dir
            .replace_if_version(&key("counter", "c1"), Version::INITIAL, silo("silo-b"))
            .await
            .unwrap();
        assert_eq!(updated.silo_id, silo("silo-b"));
        assert_eq!(updated.version, Version::INITIAL.next());
    }

    #[tokio::test]
    async fn delete_if_version_removes_entry() {
        let dir = InMemoryDirectory::new();
        dir.put_if_absent(key("counter", "c1"), silo("silo-a"))
            .await
            .unwrap();
        dir.delete_if_version(&key("counter", "c1"), Version::INITIAL)
            .await
            .unwrap();
        assert!(dir.get(&key("counter", "c1")).await.is_none());
    }

    #[tokio::test]
    async fn delete_if_version_rejects_unknown_key() {
        let dir = InMemoryDirectory::new();
        let err = dir
            .delete_if_version(&key("counter", "missing"), Version::INITIAL)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_by_silo_filters_correctly() {
        let dir = InMemoryDirectory::new();
        dir.put_if_absent(key("counter", "c1"), silo("silo-a"))
            .await
            .unwrap();
        dir.put_if_absent(key("counter", "c2"), silo("silo-b"))
            .await
            .unwrap();
        dir.put_if_absent(key("counter", "c3"), silo("silo-a"))
            .await
            .unwrap();

        let mut on_a = dir.list_by_silo(&silo("silo-a")).await;
        on_a.sort();
        assert_eq!(on_a, vec![key("counter", "c1"), key("counter", "c3")]);
    }
}

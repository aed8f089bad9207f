//! `ConsistentHashRing`: virtual-node consistent hashing over silos.

// Layer 1: Standard library imports
use std::collections::BTreeMap;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::{ActorId, ActorType, SiloId};

/// Number of virtual nodes placed on the ring per silo.
///
/// A higher count spreads a silo's share of the keyspace across more
/// positions, improving placement balance at the cost of a larger ring.
/// 64 is the smallest power-of-two that keeps the coefficient of
/// variation of key distribution low for cluster sizes up to a few
/// hundred silos.
pub const VIRTUAL_NODES_PER_SILO: u32 = 64;

/// Errors raised while placing an actor on the ring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// The ring has no silos registered.
    #[error("no silos available for placement")]
    NoSilosAvailable,
}

/// A consistent-hash ring mapping `(ActorType, ActorId)` keys to silos.
///
/// Each silo occupies [`VIRTUAL_NODES_PER_SILO`] positions on the ring,
/// computed by hashing `"{siloId}|{i}"` for `i` in `0..VIRTUAL_NODES_PER_SILO`.
/// Placement walks clockwise from the hash of the actor key to the first
/// ring position whose owning silo is registered. Hash collisions between
/// two virtual nodes are broken by the silo id's lexicographic order so
/// that placement is fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct ConsistentHashRing {
    /// Ring position -> owning silo. Sorted by key via `BTreeMap`.
    positions: BTreeMap<u64, SiloId>,
    /// Which silos currently hold at least one ring position.
    silos: Vec<SiloId>,
}

impl ConsistentHashRing {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ring pre-seeded with `silos`.
    pub fn with_silos(silos: impl IntoIterator<Item = SiloId>) -> Self {
        let mut ring = Self::new();
        for silo in silos {
            ring.add_silo(silo);
        }
        ring
    }

    /// Add a silo to the ring, inserting its virtual nodes.
    ///
    /// A no-op if the silo is already present.
    pub fn add_silo(&mut self, silo: SiloId) {
        if self.silos.contains(&silo) {
            return;
        }
        for i in 0..VIRTUAL_NODES_PER_SILO {
            let key = format!("{}|{}", silo.as_str(), i);
            let hash = fnv1a_64(key.as_bytes());
            // On collision, keep the lexicographically smaller silo id so
            // ties resolve the same way regardless of insertion order.
            match self.positions.get(&hash) {
                Some(existing) if existing <= &silo => {}
                _ => {
                    self.positions.insert(hash, silo.clone());
                }
            }
        }
        self.silos.push(silo);
        self.silos.sort();
    }

    /// Remove a silo and all of its virtual nodes from the ring.
    pub fn remove_silo(&mut self, silo: &SiloId) {
        self.positions.retain(|_, owner| owner != silo);
        self.silos.retain(|s| s != silo);
    }

    /// Currently registered silos, in lexicographic order.
    pub fn silos(&self) -> &[SiloId] {
        &self.silos
    }

    /// Number of distinct silos on the ring.
    pub fn len(&self) -> usize {
        self.silos.len()
    }

    /// Whether the ring has no silos registered.
    pub fn is_empty(&self) -> bool {
        self.silos.is_empty()
    }

    /// Determine which silo should own the activation for `(actor_type, actor_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NoSilosAvailable`] if the ring is empty.
    pub fn place(
        &self,
        actor_type: &ActorType,
        actor_id: &ActorId,
    ) -> Result<SiloId, PlacementError> {
        if self.positions.is_empty() {
            return Err(PlacementError::NoSilosAvailable);
        }
        let key = format!("{}/{}", actor_type.as_str(), actor_id.as_str());
        let hash = fnv1a_64(key.as_bytes());

        // Walk clockwise from `hash`; wrap around to the smallest position
        // if nothing is >= hash.
        if let Some((_, silo)) = self.positions.range(hash..).next() {
            return Ok(silo.clone());
        }
        #[allow(clippy::expect_used)]
        let (_, silo) = self
            .positions
            .iter()
            .next()
            .expect("checked non-empty above");
        Ok(silo.clone())
    }
}

/// FNV-1a 64-bit hash: simple, deterministic, dependency-free.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

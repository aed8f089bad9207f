//! Consistent-hash placement ring.
//!
//! Determines which silo a newly-activated actor should be placed on,
//! given the current cluster membership. Quark uses a consistent-hash
//! ring with virtual nodes so that a single silo join/leave only
//! reshuffles a small fraction of existing placements.

pub mod ring;

pub use ring::{ConsistentHashRing, PlacementError};

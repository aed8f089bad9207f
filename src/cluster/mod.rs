//! Cluster membership: heartbeat-based silo liveness tracking.
//!
//! A silo is considered alive as long as its heartbeats keep arriving
//! within the configured TTL. A background watcher task polls for
//! expired silos and emits [`MembershipEvent::SiloLeft`] so the
//! placement ring and directory can react to topology changes.

pub mod error;
pub mod membership;

pub use error::MembershipError;
pub use membership::{InMemoryMembershipStore, MembershipEvent, MembershipStore};

//! Cluster membership error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Errors raised by [`crate::cluster::MembershipStore`] operations.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Heartbeat received for a silo id that failed validation.
    #[error("invalid silo id: {0}")]
    InvalidSiloId(String),

    /// The watcher's event channel has no remaining subscribers/capacity.
    #[error("membership event channel closed")]
    ChannelClosed,

    /// Operation referenced a silo that is not currently known.
    #[error("unknown silo: {0}")]
    UnknownSilo(SiloId),
}

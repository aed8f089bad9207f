//! Transport error types.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Errors raised by [`crate::transport::Transport`] operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target silo is not known to this transport (never connected,
    /// or removed from the connection pool's routing table).
    #[error("unknown target silo: {0}")]
    UnknownSilo(SiloId),

    /// The connection pool could not obtain a connection to `target`.
    #[error("connection to {target} failed: {reason}")]
    ConnectionFailed {
        /// The silo a connection was attempted to.
        target: SiloId,
        /// Why the connection attempt failed.
        reason: String,
    },

    /// The request exceeded its deadline before a response arrived.
    #[error("request to {target} timed out after {elapsed:?}")]
    RequestTimeout {
        /// The silo the request targeted.
        target: SiloId,
        /// How long the caller waited before giving up.
        elapsed: Duration,
    },

    /// The peer closed the connection before responding.
    #[error("connection to {0} closed before response")]
    ConnectionClosed(SiloId),

    /// All configured retry attempts were exhausted.
    #[error("retries exhausted after {attempts} attempts to {target}")]
    RetriesExhausted {
        /// The silo the request targeted.
        target: SiloId,
        /// How many attempts were made.
        attempts: u32,
    },
}

impl TransportError {
    /// Whether this error represents a transient condition worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. }
                | TransportError::RequestTimeout { .. }
                | TransportError::ConnectionClosed(_)
        )
    }
}

//! Stream broker error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors raised by [`crate::streams::StreamBroker`] operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// `publish` targeted a namespace with no subscribers, and the
    /// broker is configured to treat that as an error rather than a
    /// silent no-op.
    #[error("no subscribers for stream namespace: {0}")]
    NoSubscribers(String),

    /// A subscription's queue rejected a message under the `FailFast`-style
    /// backpressure policy (`DropNewest` reports this only when asked to
    /// surface the drop rather than swallow it silently).
    #[error("subscription queue full for namespace: {0}")]
    QueueFull(String),

    /// `unsubscribe` referenced a handle that is not currently registered.
    #[error("unknown subscription handle")]
    UnknownSubscription,
}

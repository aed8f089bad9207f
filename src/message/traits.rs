//! Core message trait and priority levels.

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

/// Marker trait for payloads carried through an actor's mailbox.
///
/// Generic constraints are used instead of `Box<dyn Message>` so that each
/// actor's mailbox is monomorphized for its own message type, following the
/// same zero-cost-abstraction approach the rest of the runtime uses.
pub trait Message: Send + Sync + Clone + std::fmt::Debug + 'static {
    /// Static message type identifier, used for routing and diagnostics.
    const MESSAGE_TYPE: &'static str;

    /// Priority used by the mailbox's backpressure strategy.
    fn priority(&self) -> MessagePriority {
        MessagePriority::Normal
    }
}

/// Message priority, used to bias backpressure decisions under load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessagePriority {
    /// Best-effort, droppable under load (e.g. telemetry, non-critical streams).
    Low,
    /// Default priority for ordinary actor-to-actor calls.
    Normal,
    /// Calls that should be retried/blocked rather than dropped.
    High,
    /// Supervisory and system control traffic.
    Critical,
}

impl Default for MessagePriority {
    fn default() -> Self {
        Self::Normal
    }
}

//! Mailbox overflow policies for handling full mailboxes.
//!
//! This module defines the overflow policy applied when a bounded mailbox is
//! at capacity and a new message arrives: `Block`, `DropOldest`,
//! `DropNewest`, `FailFast`.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::message::MessagePriority;

/// Overflow policy applied when a bounded mailbox is at capacity.
///
/// # Strategy Selection
///
/// - **Block**: publisher waits (up to a deadline) for space — the default,
///   used for calls that must be delivered.
/// - **DropOldest**: evict the oldest queued message to make room for the
///   incoming one — useful for streams where only the freshest state
///   matters (e.g. telemetry).
/// - **DropNewest**: silently discard the incoming message, keeping the
///   queue as-is.
/// - **FailFast**: reject the incoming send immediately with
///   [`MailboxError::Full`](super::traits::MailboxError::Full).
///
/// # Example
///
/// ```
/// use quark::mailbox::BackpressureStrategy;
/// use quark::message::MessagePriority;
///
/// let strategy = BackpressureStrategy::for_priority(MessagePriority::Critical);
/// assert_eq!(strategy, BackpressureStrategy::Block);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BackpressureStrategy {
    /// Block the sender (subject to the sender's own deadline) until space
    /// becomes available.
    #[default]
    Block,

    /// Evict the oldest queued message to admit the incoming one.
    DropOldest,

    /// Discard the incoming message, leaving the queue unchanged.
    DropNewest,

    /// Reject the incoming send immediately with `MailboxError::Full`.
    FailFast,
}

impl fmt::Display for BackpressureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "Block"),
            Self::DropOldest => write!(f, "DropOldest"),
            Self::DropNewest => write!(f, "DropNewest"),
            Self::FailFast => write!(f, "FailFast"),
        }
    }
}

impl BackpressureStrategy {
    /// Select a default overflow policy based on message priority.
    ///
    /// # Strategy Mapping
    ///
    /// - Critical/High → Block (must be delivered)
    /// - Normal → FailFast (sender should handle failure explicitly)
    /// - Low → DropNewest (can be safely discarded)
    ///
    /// # Example
    ///
    /// ```
    /// use quark::mailbox::BackpressureStrategy;
    /// use quark::message::MessagePriority;
    ///
    /// let strategy = BackpressureStrategy::for_priority(MessagePriority::Critical);
    /// assert_eq!(strategy, BackpressureStrategy::Block);
    ///
    /// let strategy = BackpressureStrategy::for_priority(MessagePriority::Low);
    /// assert_eq!(strategy, BackpressureStrategy::DropNewest);
    /// ```
    pub fn for_priority(priority: MessagePriority) -> Self {
        match priority {
            MessagePriority::Critical | MessagePriority::High => Self::Block,
            MessagePriority::Normal => Self::FailFast,
            MessagePriority::Low => Self::DropNewest,
        }
    }
}

//! Core mailbox traits and supporting types for actor message queuing.
//!
//! - `MailboxReceiver<M>`: generic mailbox trait for receiving messages
//! - `MailboxSender<M>`: generic sender trait for sending messages
//! - `MailboxCapacity`: capacity configuration (bounded/unbounded)
//! - `MailboxError`: error types for send/receive operations

// Layer 1: Standard library imports
use std::error::Error;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
// Layer 3: Internal module imports
use crate::message::{Message, MessageEnvelope};

/// Mailbox receiver trait with generic constraints for zero-cost abstractions.
///
/// Owned exclusively by one actor turn loop; not `Clone`, unlike
/// [`MailboxSender`].
#[async_trait]
pub trait MailboxReceiver<M: Message>: Send + Sync {
    /// Error type for mailbox operations.
    type Error: Error + Send + Sync + 'static;

    /// Receive the next message, awaiting if the mailbox is currently empty.
    ///
    /// Returns `None` once the mailbox is closed and drained.
    async fn recv(&mut self) -> Option<MessageEnvelope<M>>;

    /// Try to receive a message without awaiting.
    fn try_recv(&mut self) -> Result<MessageEnvelope<M>, TryRecvError>;

    /// The mailbox's capacity configuration.
    fn capacity(&self) -> MailboxCapacity;

    /// Approximate number of messages currently queued.
    fn len(&self) -> usize;

    /// Whether the mailbox currently holds no messages.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sender interface for mailboxes with backpressure support.
///
/// Cloneable cheaply (internally `Arc`-backed) so many callers can hold a
/// handle to the same mailbox.
#[async_trait]
pub trait MailboxSender<M: Message>: Send + Sync + Clone {
    /// Error type for send operations.
    type Error: Error + Send + Sync + 'static;

    /// Send a message, applying the mailbox's configured backpressure
    /// strategy if the mailbox is at capacity.
    async fn send(&self, envelope: MessageEnvelope<M>) -> Result<(), Self::Error>;

    /// Try to send a message without awaiting, failing immediately if the
    /// mailbox is full or closed.
    fn try_send(&self, envelope: MessageEnvelope<M>) -> Result<(), Self::Error>;
}

/// Mailbox capacity configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxCapacity {
    /// Bounded mailbox with a maximum number of queued messages.
    Bounded(usize),
    /// Unbounded mailbox (no capacity limit).
    Unbounded,
}

/// Mailbox error types.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    /// Mailbox is full (bounded mailboxes with the `FailFast` strategy).
    #[error("mailbox is full (capacity: {capacity})")]
    Full { capacity: usize },

    /// Mailbox is closed (receiver dropped).
    #[error("mailbox is closed")]
    Closed,

    /// Backpressure strategy was applied to an incoming send.
    #[error("backpressure applied: {strategy:?}")]
    BackpressureApplied {
        strategy: crate::mailbox::BackpressureStrategy,
    },

    /// Message deadline had already passed by the time it was dequeued
    /// ( chrono `DateTime<Utc>`).
    #[error("deadline exceeded for message enqueued at {enqueued_at}")]
    DeadlineExceeded { enqueued_at: DateTime<Utc> },
}

/// Non-blocking receive error types.
#[derive(Debug, thiserror::Error)]
pub enum TryRecvError {
    /// Mailbox is empty (no messages available right now).
    #[error("mailbox is empty")]
    Empty,
    /// Mailbox is closed (receiver dropped).
    #[error("mailbox is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_capacity_variants() {
        assert_eq!(MailboxCapacity::Bounded(100), MailboxCapacity::Bounded(100));
        assert_ne!(MailboxCapacity::Bounded(100), MailboxCapacity::Unbounded);
    }

    #[test]
    fn test_mailbox_error_full_message() {
        let err = MailboxError::Full { capacity: 100 };
        let msg = err.to_string();
        assert!(msg.contains("full"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_mailbox_error_closed_message() {
        assert_eq!(MailboxError::Closed.to_string(), "mailbox is closed");
    }

    #[test]
    fn test_mailbox_error_deadline_exceeded() {
        let now = Utc::now();
        let err = MailboxError::DeadlineExceeded { enqueued_at: now };
        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[test]
    fn test_try_recv_error_messages() {
        assert_eq!(TryRecvError::Empty.to_string(), "mailbox is empty");
        assert_eq!(TryRecvError::Closed.to_string(), "mailbox is closed");
    }
}

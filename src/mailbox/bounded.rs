//! Bounded mailbox with a configurable overflow policy.
//!
//! Unlike a plain `tokio::sync::mpsc` channel, a bounded mailbox here is
//! backed by a shared `VecDeque` so that the `DropOldest` overflow policy
//! can evict from the front of the queue — something a channel's
//! sender-only API cannot do, since the sender never has a handle back to
//! already-queued items.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;

// Layer 3: Internal module imports
use super::backpressure::BackpressureStrategy;
use super::metrics::{AtomicMetrics, MetricsRecorder};
use super::traits::{MailboxCapacity, MailboxError, MailboxReceiver, MailboxSender, TryRecvError};
use crate::message::{Message, MessageEnvelope};

struct Shared<M: Message> {
    queue: Mutex<VecDeque<MessageEnvelope<M>>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
    sender_count: AtomicUsize,
    receiver_closed: AtomicBool,
}

/// Bounded mailbox with configurable capacity and an overflow policy.
///
/// # Type Parameters
///
/// * `M` - The message type implementing [`Message`]
/// * `R` - The metrics recorder implementing [`MetricsRecorder`] (default: [`AtomicMetrics`])
///
/// # Example
///
/// ```ignore
/// use quark::mailbox::{BoundedMailbox, AtomicMetrics};
///
/// let (mailbox, sender) = BoundedMailbox::<MyMessage, AtomicMetrics>::new(100);
/// ```
pub struct BoundedMailbox<M: Message, R: MetricsRecorder> {
    shared: Arc<Shared<M>>,
    pub metrics: Arc<R>,
}

/// Sender for [`BoundedMailbox`], applying its configured overflow policy.
pub struct BoundedMailboxSender<M: Message, R: MetricsRecorder> {
    shared: Arc<Shared<M>>,
    backpressure_strategy: BackpressureStrategy,
    pub metrics: Arc<R>,
}

impl<M: Message, R: MetricsRecorder> BoundedMailbox<M, R> {
    /// Create a new bounded mailbox with a custom metrics recorder and the
    /// default `Block` overflow policy.
    pub fn with_metrics(capacity: usize, metrics: R) -> (Self, BoundedMailboxSender<M, R>) {
        Self::with_backpressure_and_metrics(capacity, BackpressureStrategy::Block, metrics)
    }

    /// Create a bounded mailbox with a custom overflow policy and metrics
    /// recorder.
    pub fn with_backpressure_and_metrics(
        capacity: usize,
        strategy: BackpressureStrategy,
        metrics: R,
    ) -> (Self, BoundedMailboxSender<M, R>) {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            sender_count: AtomicUsize::new(1),
            receiver_closed: AtomicBool::new(false),
        });
        let metrics = Arc::new(metrics);

        let mailbox = Self {
            shared: Arc::clone(&shared),
            metrics: Arc::clone(&metrics),
        };
        let sender = BoundedMailboxSender {
            shared,
            backpressure_strategy: strategy,
            metrics,
        };
        (mailbox, sender)
    }
}

impl<M: Message> BoundedMailbox<M, AtomicMetrics> {
    /// Create a new bounded mailbox with the default `Block` overflow
    /// policy and `AtomicMetrics`.
    pub fn new(capacity: usize) -> (Self, BoundedMailboxSender<M, AtomicMetrics>) {
        Self::with_metrics(capacity, AtomicMetrics::new())
    }

    /// Create a bounded mailbox with a custom overflow policy and
    /// `AtomicMetrics`.
    pub fn with_backpressure(
        capacity: usize,
        strategy: BackpressureStrategy,
    ) -> (Self, BoundedMailboxSender<M, AtomicMetrics>) {
        Self::with_backpressure_and_metrics(capacity, strategy, AtomicMetrics::new())
    }
}

impl<M: Message, R: MetricsRecorder> Drop for BoundedMailbox<M, R> {
    fn drop(&mut self) {
        self.shared.receiver_closed.store(true, Ordering::SeqCst);
        self.shared.not_full.notify_waiters();
    }
}

impl<M: Message, R: MetricsRecorder> Clone for BoundedMailboxSender<M, R> {
    fn clone(&self) -> Self {
        self.shared.sender_count.fetch_add(1, Ordering::SeqCst);
        Self {
            shared: Arc::clone(&self.shared),
            backpressure_strategy: self.backpressure_strategy,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

fn is_expired<M: Message>(envelope: &MessageEnvelope<M>) -> bool {
    match envelope.ttl {
        Some(ttl) => {
            let elapsed = Utc::now()
                .signed_duration_since(envelope.timestamp)
                .num_seconds()
                .max(0) as u64;
            elapsed > ttl
        }
        None => false,
    }
}

#[async_trait]
impl<M: Message, R: MetricsRecorder> MailboxReceiver<M> for BoundedMailbox<M, R> {
    type Error = MailboxError;

    async fn recv(&mut self) -> Option<MessageEnvelope<M>> {
        loop {
            {
                let mut queue = self.shared.queue.lock();
                if let Some(envelope) = queue.pop_front() {
                    self.shared.not_full.notify_one();
                    drop(queue);
                    if is_expired(&envelope) {
                        self.metrics.record_dropped();
                        continue;
                    }
                    self.metrics.record_received();
                    self.metrics.update_last_message(Utc::now());
                    return Some(envelope);
                }
            }

            if self.shared.sender_count.load(Ordering::SeqCst) == 0 {
                return None;
            }

            self.shared.not_empty.notified().await;
        }
    }

    fn try_recv(&mut self) -> Result<MessageEnvelope<M>, TryRecvError> {
        loop {
            let mut queue = self.shared.queue.lock();
            match queue.pop_front() {
                Some(envelope) => {
                    self.shared.not_full.notify_one();
                    drop(queue);
                    if is_expired(&envelope) {
                        self.metrics.record_dropped();
                        continue;
                    }
                    self.metrics.record_received();
                    self.metrics.update_last_message(Utc::now());
                    return Ok(envelope);
                }
                None => {
                    drop(queue);
                    return if self.shared.sender_count.load(Ordering::SeqCst) == 0 {
                        Err(TryRecvError::Closed)
                    } else {
                        Err(TryRecvError::Empty)
                    };
                }
            }
        }
    }

    fn capacity(&self) -> MailboxCapacity {
        MailboxCapacity::Bounded(self.shared.capacity)
    }

    fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<M: Message, R: MetricsRecorder + Clone> MailboxSender<M> for BoundedMailboxSender<M, R> {
    type Error = MailboxError;

    async fn send(&self, envelope: MessageEnvelope<M>) -> Result<(), Self::Error> {
        loop {
            if self.shared.receiver_closed.load(Ordering::SeqCst) {
                return Err(MailboxError::Closed);
            }

            {
                let mut queue = self.shared.queue.lock();
                if queue.len() < self.shared.capacity {
                    queue.push_back(envelope);
                    drop(queue);
                    self.shared.not_empty.notify_one();
                    self.metrics.record_sent();
                    return Ok(());
                }

                match self.backpressure_strategy {
                    BackpressureStrategy::DropOldest => {
                        queue.pop_front();
                        queue.push_back(envelope);
                        drop(queue);
                        self.metrics.record_dropped();
                        self.shared.not_empty.notify_one();
                        self.metrics.record_sent();
                        return Ok(());
                    }
                    BackpressureStrategy::DropNewest => {
                        drop(queue);
                        self.metrics.record_dropped();
                        return Ok(());
                    }
                    BackpressureStrategy::FailFast => {
                        drop(queue);
                        return Err(MailboxError::Full {
                            capacity: self.shared.capacity,
                        });
                    }
                    BackpressureStrategy::Block => {
                        drop(queue);
                    }
                }
            }

            // Block: wait for space, then retry the whole loop.
            self.shared.not_full.notified().await;
        }
    }

    fn try_send(&self, envelope: MessageEnvelope<M>) -> Result<(), Self::Error> {
        if self.shared.receiver_closed.load(Ordering::SeqCst) {
            return Err(MailboxError::Closed);
        }

        let mut queue = self.shared.queue.lock();
        if queue.len() < self.shared.capacity {
            queue.push_back(envelope);
            drop(queue);
            self.shared.not_empty.notify_one();
            self.metrics.record_sent();
            return Ok(());
        }

        match self.backpressure_strategy {
            BackpressureStrategy::DropOldest => {
                queue.pop_front();
                queue.push_back(envelope);
                drop(queue);
                self.metrics.record_dropped();
                self.shared.not_empty.notify_one();
                self.metrics.record_sent();
                Ok(())
            }
            BackpressureStrategy::DropNewest => {
                drop(queue);
                self.metrics.record_dropped();
                Ok(())
            }
            BackpressureStrategy::Block | BackpressureStrategy::FailFast => {
                drop(queue);
                Err(MailboxError::Full {
                    capacity: self.shared.capacity,
                })
            }
        }
    }
}

impl<M: Message, R: MetricsRecorder> Drop for BoundedMailboxSender<M, R> {
    fn drop(&mut self) {
        if self.shared.sender_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.not_empty.notify_waiters();
        }
    }
}

//! `StreamBroker`: implicit and explicit pub/sub over named streams.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

// Layer 3: Internal module imports
use crate::streams::error::BrokerError;
use crate::util::ActorType;

/// `(Namespace, Key)`: identifies one stream. `Key` partitions the
/// namespace and becomes the `ActorId` of every implicit consumer a
/// publish to this stream fans out to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId {
    /// Routes to the consumer type(s) registered against it.
    pub namespace: String,
    /// Partitions the namespace; doubles as the implicit consumer's `ActorId`.
    pub key: String,
}

impl StreamId {
    /// Build a stream id from its namespace and key.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

/// Delivers one published message to a single implicit-consumer
/// activation.
///
/// `StreamBroker` only knows about namespaces, keys and byte payloads; it
/// has no notion of activations or method dispatch. Implemented by a
/// dispatcher private to [`crate::system::runtime`] that closes over the
/// activation registry actually running `OnStreamMessage`, keeping this
/// module independent of the actor/proxy stack.
#[async_trait]
pub trait ImplicitConsumerDispatch: Send + Sync {
    /// Deliver `payload` published to `stream_id` to the `consumer_type`
    /// activation identified by `stream_id.key`.
    async fn deliver(&self, consumer_type: &ActorType, stream_id: &StreamId, payload: Bytes);
}

/// Overflow policy applied to one subscription's buffer when it is full.
///
/// Mirrors [`crate::mailbox::BackpressureStrategy`] in shape (this
/// runtime applies the same four-way taxonomy to every bounded queue),
/// plus a rate-limiting `Throttle` mode specific to streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamBackpressure {
    /// Publisher waits for buffer space.
    Block,
    /// Evict the oldest buffered message to admit the incoming one.
    DropOldest,
    /// Discard the incoming message, leaving the buffer unchanged.
    DropNewest,
    /// Admit at most `max_per_window` messages per `window`; excess
    /// messages in the same window are dropped and counted as throttled.
    Throttle {
        /// Messages admitted per window.
        max_per_window: usize,
        /// The throttling window.
        window: Duration,
    },
}

/// An opaque handle identifying one explicit subscription, returned by
/// [`StreamBroker::subscribe`] and required by
/// [`StreamBroker::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(Uuid);

impl StreamHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A point-in-time read of one namespace's delivery metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMetricsSnapshot {
    /// Total messages successfully published to at least one subscriber.
    pub published: u64,
    /// Total messages dropped by any subscription's backpressure policy.
    pub dropped: u64,
    /// Total messages rejected by `Throttle`.
    pub throttled: u64,
    /// Current aggregate buffered-message count across all subscriptions.
    pub buffered: u64,
}

#[derive(Default)]
struct NamespaceMetrics {
    published: AtomicU64,
    dropped: AtomicU64,
    throttled: AtomicU64,
}

struct ThrottleState {
    window_start: Mutex<chrono::DateTime<Utc>>,
    count_in_window: AtomicU64,
}

struct Subscription {
    queue: Mutex<VecDeque<Bytes>>,
    capacity: usize,
    backpressure: StreamBackpressure,
    not_empty: Arc<Notify>,
    throttle: Option<ThrottleState>,
}

impl Subscription {
    fn new(capacity: usize, backpressure: StreamBackpressure) -> Self {
        let throttle = match backpressure {
            StreamBackpressure::Throttle { .. } => Some(ThrottleState {
                window_start: Mutex::new(Utc::now()),
                count_in_window: AtomicU64::new(0),
            }),
            _ => None,
        };
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            backpressure,
            not_empty: Arc::new(Notify::new()),
            throttle,
        }
    }

    /// Deliver `payload`. Returns `true` if it was enqueued, `false` if
    /// it was dropped or throttled by this subscription's policy.
    fn deliver(&self, payload: Bytes, metrics: &NamespaceMetrics) -> bool {
        if let StreamBackpressure::Throttle { max_per_window, window } = self.backpressure {
            #[allow(clippy::unwrap_used)]
            let throttle = self.throttle.as_ref().unwrap();
            let now = Utc::now();
            let mut window_start = throttle.window_start.lock();
            let elapsed = (now - *window_start).to_std().unwrap_or(Duration::ZERO);
            if elapsed >= window {
                *window_start = now;
                throttle.count_in_window.store(0, Ordering::SeqCst);
            }
            if throttle.count_in_window.fetch_add(1, Ordering::SeqCst) as usize >= max_per_window {
                metrics.throttled.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        }

        let mut queue = self.queue.lock();
        if queue.len() < self.capacity {
            queue.push_back(payload);
            drop(queue);
            self.not_empty.notify_one();
            return true;
        }

        match self.backpressure {
            StreamBackpressure::DropOldest => {
                queue.pop_front();
                queue.push_back(payload);
                drop(queue);
                self.not_empty.notify_one();
                metrics.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            StreamBackpressure::DropNewest => {
                metrics.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            StreamBackpressure::Block | StreamBackpressure::Throttle { .. } => {
                // The in-process reference broker never blocks the
                // publisher's task indefinitely; a full buffer under
                // `Block` is reported as a drop so `publish` stays
                // non-blocking. A production transport-backed broker
                // would await `not_full` here instead.
                metrics.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    fn try_recv(&self) -> Option<Bytes> {
        self.queue.lock().pop_front()
    }

    async fn recv(&self) -> Option<Bytes> {
        loop {
            if let Some(item) = self.try_recv() {
                return Some(item);
            }
            self.not_empty.notified().await;
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

/// A receiver for one stream subscription.
pub struct StreamReceiver {
    handle: StreamHandle,
    namespace: String,
    subscription: Arc<Subscription>,
}

impl StreamReceiver {
    /// This subscription's handle (for `unsubscribe`).
    pub fn handle(&self) -> StreamHandle {
        self.handle
    }

    /// The namespace this subscription receives from.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Pop the next buffered message, waiting if the buffer is empty.
    pub async fn recv(&self) -> Option<Bytes> {
        self.subscription.recv().await
    }

    /// Pop the next buffered message without waiting.
    pub fn try_recv(&self) -> Option<Bytes> {
        self.subscription.try_recv()
    }
}

/// An implicit subscription declaration: a consumer type (and, for
/// documentation/diagnostics, the message type it expects) registered
/// against a namespace ahead of any explicit subscriber showing up.
#[derive(Debug, Clone)]
pub struct ImplicitRegistration {
    /// The actor behavior that consumes this namespace's messages.
    pub consumer_type: ActorType,
    /// The message type name the consumer expects, for diagnostics.
    pub message_type: &'static str,
}

/// Pub/sub broker over named streams ("namespaces").
///
/// Two subscription styles are supported:
///
/// - **Implicit**: [`StreamBroker::register_implicit`] declares that a
///   given actor type consumes a namespace; the host uses this
///   registration to route published messages to that actor type's
///   `OnStreamMessage` hook without any subscriber having to be alive
///   yet.
/// - **Explicit**: [`StreamBroker::subscribe`] hands back a
///   [`StreamReceiver`] directly, for callers that want to pull
///   messages themselves (e.g. the windowing operators in
///   [`crate::streams::operators`]).
pub struct StreamBroker {
    subscriptions: DashMap<StreamHandle, (String, Arc<Subscription>)>,
    by_namespace: DashMap<String, Vec<StreamHandle>>,
    implicit: DashMap<String, Vec<ImplicitRegistration>>,
    metrics: DashMap<String, Arc<NamespaceMetrics>>,
    default_capacity: usize,
    default_backpressure: StreamBackpressure,
    implicit_dispatch: Mutex<Option<Arc<dyn ImplicitConsumerDispatch>>>,
}

impl StreamBroker {
    /// Create a broker with default per-subscription capacity and
    /// backpressure policy, used when callers don't override them.
    pub fn new(default_capacity: usize, default_backpressure: StreamBackpressure) -> Self {
        Self {
            subscriptions: DashMap::new(),
            by_namespace: DashMap::new(),
            implicit: DashMap::new(),
            metrics: DashMap::new(),
            default_capacity,
            default_backpressure,
            implicit_dispatch: Mutex::new(None),
        }
    }

    /// Wire in the dispatcher [`Self::publish_keyed`] hands implicit
    /// consumers off to. Without one, `publish_keyed` still fans out to
    /// explicit subscribers but implicit consumers are skipped.
    pub fn set_implicit_dispatch(&self, dispatch: Arc<dyn ImplicitConsumerDispatch>) {
        *self.implicit_dispatch.lock() = Some(dispatch);
    }

    /// Declare that `consumer_type` implicitly consumes `namespace`.
    pub fn register_implicit(
        &self,
        namespace: impl Into<String>,
        consumer_type: ActorType,
        message_type: &'static str,
    ) {
        self.implicit
            .entry(namespace.into())
            .or_default()
            .push(ImplicitRegistration {
                consumer_type,
                message_type,
            });
    }

    /// List the implicit consumers declared for `namespace`.
    pub fn implicit_consumers(&self, namespace: &str) -> Vec<ImplicitRegistration> {
        self.implicit.get(namespace).map(|v| v.clone()).unwrap_or_default()
    }

    /// Create an explicit subscription to `namespace` using the
    /// broker's default capacity and backpressure policy.
    pub fn subscribe(&self, namespace: impl Into<String>) -> StreamReceiver {
        self.subscribe_with(namespace, self.default_capacity, self.default_backpressure)
    }

    /// Create an explicit subscription with an overridden capacity and
    /// backpressure policy.
    pub fn subscribe_with(
        &self,
        namespace: impl Into<String>,
        capacity: usize,
        backpressure: StreamBackpressure,
    ) -> StreamReceiver {
        let namespace = namespace.into();
        let handle = StreamHandle::new();
        let subscription = Arc::new(Subscription::new(capacity, backpressure));
        self.subscriptions
            .insert(handle, (namespace.clone(), Arc::clone(&subscription)));
        self.by_namespace.entry(namespace.clone()).or_default().push(handle);
        StreamReceiver {
            handle,
            namespace,
            subscription,
        }
    }

    /// Remove an explicit subscription.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownSubscription`] if `handle` is not registered.
    pub fn unsubscribe(&self, handle: StreamHandle) -> Result<(), BrokerError> {
        let (namespace, _) = self
            .subscriptions
            .remove(&handle)
            .ok_or(BrokerError::UnknownSubscription)?;
        if let Some(mut handles) = self.by_namespace.get_mut(&namespace) {
            handles.retain(|h| *h != handle);
        }
        Ok(())
    }

    /// Publish `payload` to every explicit subscriber of `namespace`.
    ///
    /// Each subscriber's own backpressure policy decides whether it
    /// receives the message or it is dropped/throttled for that
    /// subscriber specifically; a message fanning out to five
    /// subscribers can be delivered to three and dropped for two.
    /// Returns the number of subscribers that actually received it.
    pub async fn publish(&self, namespace: &str, payload: Bytes) -> usize {
        let metrics = self
            .metrics
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(NamespaceMetrics::default()))
            .clone();

        let handles = self
            .by_namespace
            .get(namespace)
            .map(|v| v.clone())
            .unwrap_or_default();

        let mut delivered = 0;
        for handle in handles {
            if let Some(entry) = self.subscriptions.get(&handle) {
                if entry.1.deliver(payload.clone(), &metrics) {
                    delivered += 1;
                }
            }
        }
        if delivered > 0 {
            metrics.published.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    /// Publish `payload` to `stream_id`, fanning out to both explicit
    /// subscribers of `stream_id.namespace` (as [`Self::publish`] does)
    /// and every implicit consumer registered for that namespace, via
    /// the dispatcher set with [`Self::set_implicit_dispatch`].
    ///
    /// `stream_id.key` becomes the `ActorId` each implicit consumer is
    /// addressed as: a namespace partitioned by order id, say, delivers
    /// each publish only to the consumer activation for that order.
    /// Returns the explicit-subscriber delivery count; implicit delivery
    /// is fire-and-forget and does not affect it.
    pub async fn publish_keyed(&self, stream_id: &StreamId, payload: Bytes) -> usize {
        let delivered = self.publish(&stream_id.namespace, payload.clone()).await;

        let consumers = self.implicit_consumers(&stream_id.namespace);
        if !consumers.is_empty() {
            let dispatch = self.implicit_dispatch.lock().clone();
            if let Some(dispatch) = dispatch {
                for consumer in consumers {
                    dispatch
                        .deliver(&consumer.consumer_type, stream_id, payload.clone())
                        .await;
                }
            }
        }

        delivered
    }

    /// Current aggregate buffered-message count across every
    /// subscription to `namespace`.
    fn buffered(&self, namespace: &str) -> u64 {
        self.by_namespace
            .get(namespace)
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(|h| self.subscriptions.get(h))
                    .map(|entry| entry.1.len() as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Snapshot the delivery metrics for `namespace`.
    pub fn metrics(&self, namespace: &str) -> StreamMetricsSnapshot {
        let counters = self.metrics.get(namespace);
        StreamMetricsSnapshot {
            published: counters
                .as_ref()
                .map(|m| m.published.load(Ordering::Relaxed))
                .unwrap_or(0),
            dropped: counters
                .as_ref()
                .map(|m| m.dropped.load(Ordering::Relaxed))
                .unwrap_or(0),
            throttled: counters
                .as_ref()
                .map(|m| m.throttled.load(Ordering::Relaxed))
                .unwrap_or(0),
            buffered: self.buffered(namespace),
        }
    }
}

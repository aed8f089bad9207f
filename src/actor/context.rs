//! Per-activation context passed to every `Actor` lifecycle hook.

// Layer 1: Standard library imports
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
// Layer 3: Internal module imports
use crate::actor::host::{ActorHost, UnconfiguredHost};
use crate::broker::MessageBroker;
use crate::message::{CorrelationId, Message, MessageEnvelope, RequestId};
use crate::persistence::{ReminderError, StateStoreError, StateVersion};
use crate::util::{ActorAddress, ActorKey, InstanceId};

/// Cooperative cancellation signal for the call currently in flight.
///
/// Handlers may poll [`CancellationSignal::is_cancelled`] during long-running
/// work, or `.await` [`CancellationSignal::cancelled`] to return early once
/// the caller gives up (deadline exceeded, caller disconnected).
pub type CancellationSignal = CancellationToken;

/// Handle to an in-flight timer registered through [`ActorContext::register_timer`].
///
/// Shares one [`CancellationToken`] with the context's own copy, so
/// either this handle's [`Self::cancel`] or [`ActorContext::stop_timers`]
/// (called on deactivation) stops the same underlying task.
#[derive(Clone)]
pub struct TimerHandle {
    name: String,
    cancel: CancellationToken,
}

impl TimerHandle {
    /// The name this timer was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the timer. A no-op if it already fired (one-shot) or was
    /// already cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Actor context with metadata and broker access.
///
/// Generic over the actor's message type `M` and the broker implementation
/// `B` it was spawned with, so `handle_message`/`pre_start`/`post_stop` can
/// route further messages without the broker ever appearing in the `Actor`
/// trait's own bounds.
///
/// Carries the identity and per-call metadata the host exposes to handlers:
/// the activation's stable [`ActorKey`] (when spawned for a virtual actor,
/// as opposed to the in-process mailbox/broker engine's own anonymous or
/// named addressing), and the [`CorrelationId`]/[`RequestId`]/
/// [`CancellationSignal`] of whichever message is currently being handled.
pub struct ActorContext<M: Message, B: MessageBroker<M>> {
    address: ActorAddress,
    id: InstanceId,
    actor_key: Option<ActorKey>,
    broker: B,
    created_at: DateTime<Utc>,
    correlation_id: CorrelationId,
    request_id: RequestId,
    cancellation: CancellationSignal,
    host: Arc<dyn ActorHost>,
    timers: Vec<TimerHandle>,
    _marker: PhantomData<M>,
}

impl<M: Message, B: MessageBroker<M>> ActorContext<M, B> {
    /// Create a new actor context for an activation at `address`, wired to
    /// `broker` for outbound routing.
    ///
    /// `correlation_id`/`request_id`/the cancellation signal start fresh;
    /// [`Self::begin_call`] refreshes them for each dequeued message. No
    /// durable-state/reminder host is attached; [`Self::load_state`] and
    /// friends return an error until [`Self::with_host`] attaches one.
    pub fn new(address: ActorAddress, broker: B) -> Self {
        Self {
            id: *address.id(),
            address,
            actor_key: None,
            broker,
            created_at: Utc::now(),
            correlation_id: CorrelationId::new(),
            request_id: RequestId::new(),
            cancellation: CancellationToken::new(),
            host: Arc::new(UnconfiguredHost),
            timers: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Attach the stable `(ActorType, ActorId)` identity of the virtual
    /// actor this activation backs.
    pub fn with_actor_key(mut self, actor_key: ActorKey) -> Self {
        self.actor_key = Some(actor_key);
        self
    }

    /// Attach the durable-state/reminder capability for this activation.
    /// A [`crate::system::QuarkRuntime`] calls this when spawning a
    /// virtual actor; plain `ActorSystem` usage leaves the default
    /// [`UnconfiguredHost`] in place.
    pub fn with_host(mut self, host: Arc<dyn ActorHost>) -> Self {
        self.host = host;
        self
    }

    /// Refresh the per-call metadata (correlation id, request id, and a
    /// fresh cancellation token) from the envelope of the message about to
    /// be handled. Called by the turn loop immediately before dispatching
    /// to the actor's handler.
    pub fn begin_call(&mut self, envelope: &MessageEnvelope<M>) {
        self.correlation_id = envelope.correlation_id;
        self.request_id = envelope.request_id;
        self.cancellation = CancellationToken::new();
    }

    /// Get the actor's address.
    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    /// Get the actor's instance id.
    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    /// Get the stable `(ActorType, ActorId)` identity of this activation,
    /// if it was spawned for a virtual actor rather than addressed directly.
    pub fn actor_key(&self) -> Option<&ActorKey> {
        self.actor_key.as_ref()
    }

    /// Get the actor's creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Correlation id of the message currently being handled.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Request id of the message currently being handled.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Cancellation signal for the call currently in flight.
    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    /// Borrow the broker handle for sending further messages.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Load this activation's durable record for `slot`, if one exists.
    pub async fn load_state(&self, slot: &str) -> Result<Option<(Bytes, StateVersion)>, StateStoreError> {
        self.host.load_state(slot).await
    }

    /// Persist `payload` for `slot`, guarded by `expected_version`.
    pub async fn save_state(
        &self,
        slot: &str,
        payload: Bytes,
        expected_version: Option<StateVersion>,
    ) -> Result<StateVersion, StateStoreError> {
        self.host.save_state(slot, payload, expected_version).await
    }

    /// Delete this activation's record for `slot`, guarded by `expected_version`.
    pub async fn delete_state(&self, slot: &str, expected_version: StateVersion) -> Result<(), StateStoreError> {
        self.host.delete_state(slot, expected_version).await
    }

    /// Register (or replace) a durable reminder for this activation.
    pub async fn register_reminder(
        &self,
        name: &str,
        due_time: DateTime<Utc>,
        period: Option<Duration>,
        payload: Bytes,
    ) -> Result<(), ReminderError> {
        self.host.register_reminder(name, due_time, period, payload).await
    }

    /// Cancel a previously registered durable reminder.
    pub async fn unregister_reminder(&self, name: &str) -> Result<(), ReminderError> {
        self.host.unregister_reminder(name).await
    }

    /// Register an in-memory timer that re-enqueues `message` onto this
    /// actor's own mailbox after `due`, and every `period` thereafter if
    /// given (one-shot otherwise). The callback is delivered as an
    /// ordinary message, so it observes the same turn ordering as any
    /// other envelope.
    ///
    /// The returned [`TimerHandle`] is also retained by this context so
    /// [`Self::stop_timers`] can cancel it on deactivation; callers don't
    /// need to hold on to it unless they want to cancel it early.
    pub fn register_timer(
        &mut self,
        name: impl Into<String>,
        due: Duration,
        period: Option<Duration>,
        message: M,
    ) -> TimerHandle
    where
        M: Clone,
    {
        let name = name.into();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let broker = self.broker.clone();
        let target = self.address.clone();
        tokio::spawn(async move {
            let deliver = async move {
                tokio::time::sleep(due).await;
                loop {
                    let envelope = MessageEnvelope::new(message.clone()).with_reply_to(target.clone());
                    if broker.send(envelope).await.is_err() {
                        break;
                    }
                    match period {
                        Some(interval) => tokio::time::sleep(interval).await,
                        None => break,
                    }
                }
            };
            tokio::select! {
                _ = deliver => {}
                _ = task_token.cancelled() => {}
            }
        });

        let handle = TimerHandle {
            name: name.clone(),
            cancel: token.clone(),
        };
        self.timers.push(TimerHandle { name, cancel: token });
        handle
    }

    /// Cancel every timer registered through [`Self::register_timer`] that
    /// this context is still tracking. Called by the host on deactivation
    /// (restart, explicit stop, or idle timeout).
    pub fn stop_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryMessageBroker;
    use crate::message::MessagePriority;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct TestMessage;

    impl Message for TestMessage {
        const MESSAGE_TYPE: &'static str = "test_message";

        fn priority(&self) -> MessagePriority {
            MessagePriority::Normal
        }
    }

    #[test]
    fn test_context_exposes_address_and_id() {
        let address = ActorAddress::named("worker");
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let context = ActorContext::new(address.clone(), broker);

        assert_eq!(context.address(), &address);
        assert_eq!(*context.id(), *address.id());
    }

    #[test]
    fn test_context_exposes_broker() {
        let address = ActorAddress::anonymous();
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let context = ActorContext::new(address, broker);

        let _: &InMemoryMessageBroker<TestMessage> = context.broker();
    }

    #[test]
    fn test_context_carries_actor_key() {
        use crate::util::{ActorId, ActorType};

        let address = ActorAddress::anonymous();
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let key = ActorKey::new(ActorType::new("counter").unwrap(), ActorId::new("c1").unwrap());
        let context = ActorContext::new(address, broker).with_actor_key(key.clone());

        assert_eq!(context.actor_key(), Some(&key));
    }

    #[test]
    fn test_begin_call_refreshes_correlation_and_request_ids() {
        let address = ActorAddress::anonymous();
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let mut context = ActorContext::new(address, broker);

        let initial_correlation = context.correlation_id();
        let envelope = MessageEnvelope::new(TestMessage);
        context.begin_call(&envelope);

        assert_eq!(context.correlation_id(), envelope.correlation_id);
        assert_eq!(context.request_id(), envelope.request_id);
        assert_ne!(context.correlation_id(), initial_correlation);
    }

    #[test]
    fn test_cancellation_starts_uncancelled() {
        let address = ActorAddress::anonymous();
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let context = ActorContext::new(address, broker);

        assert!(!context.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn without_host_state_calls_return_backend_error() {
        let address = ActorAddress::anonymous();
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let context = ActorContext::new(address, broker);

        let err = context.load_state("profile").await.unwrap_err();
        assert!(matches!(err, StateStoreError::Backend(_)));
    }

    #[tokio::test]
    async fn with_host_state_calls_delegate_to_host() {
        use crate::actor::host::ActorHost;
        use crate::persistence::ReminderError;
        use async_trait::async_trait;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct CountingHost {
            saves: AtomicUsize,
        }

        #[async_trait]
        impl ActorHost for CountingHost {
            async fn load_state(&self, _slot: &str) -> Result<Option<(Bytes, StateVersion)>, StateStoreError> {
                Ok(None)
            }
            async fn save_state(
                &self,
                _slot: &str,
                _payload: Bytes,
                _expected_version: Option<StateVersion>,
            ) -> Result<StateVersion, StateStoreError> {
                self.saves.fetch_add(1, Ordering::SeqCst);
                Ok(StateVersion::INITIAL)
            }
            async fn delete_state(&self, _slot: &str, _expected_version: StateVersion) -> Result<(), StateStoreError> {
                Ok(())
            }
            async fn register_reminder(
                &self,
                _name: &str,
                _due_time: DateTime<Utc>,
                _period: Option<Duration>,
                _payload: Bytes,
            ) -> Result<(), ReminderError> {
                Ok(())
            }
            async fn unregister_reminder(&self, _name: &str) -> Result<(), ReminderError> {
                Ok(())
            }
        }

        let host = Arc::new(CountingHost::default());
        let address = ActorAddress::anonymous();
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let context = ActorContext::new(address, broker).with_host(host.clone());

        let version = context
            .save_state("profile", Bytes::from_static(b"{}"), None)
            .await
            .unwrap();
        assert_eq!(version, StateVersion::INITIAL);
        assert_eq!(host.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_timer_redelivers_message_to_self() {
        use crate::mailbox::{MailboxReceiver, UnboundedMailbox};

        let address = ActorAddress::named("timer-actor");
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let (mut mailbox, sender) = UnboundedMailbox::<TestMessage, _>::new();
        broker.register_actor(address.clone(), sender).unwrap();

        let mut context = ActorContext::new(address, broker);
        let _handle = context.register_timer("tick", Duration::from_millis(5), None, TestMessage);

        let envelope = tokio::time::timeout(Duration::from_secs(1), mailbox.recv())
            .await
            .expect("timer should fire")
            .expect("mailbox should yield a message");
        assert_eq!(envelope.payload.priority(), MessagePriority::Normal);
    }

    #[tokio::test]
    async fn stop_timers_prevents_cancelled_timer_firing() {
        use crate::mailbox::{MailboxReceiver, UnboundedMailbox};

        let address = ActorAddress::named("cancel-actor");
        let broker = InMemoryMessageBroker::<TestMessage>::new();
        let (mut mailbox, sender) = UnboundedMailbox::<TestMessage, _>::new();
        broker.register_actor(address.clone(), sender).unwrap();

        let mut context = ActorContext::new(address, broker);
        context.register_timer("tick", Duration::from_millis(50), None, TestMessage);
        context.stop_timers();

        let result = tokio::time::timeout(Duration::from_millis(100), mailbox.recv()).await;
        assert!(result.is_err(), "cancelled timer should not deliver");
    }
}

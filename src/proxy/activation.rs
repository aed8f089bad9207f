//! Per-activation mailbox/turn-loop backing [`crate::proxy::ActorProxy`]'s
//! local dispatch path.
//!
//! Each `(ActorType, ActorId)` gets at most one activation at a time: the
//! first call through [`ActivationRegistry::dispatch`] spawns a turn-loop
//! task with its own bounded mailbox, runs `OnActivate`, then serially
//! drains queued [`VirtualCall`]s, invoking each one's method through the
//! shared [`MethodTable`]. Calls whose `ChainId` matches the activation's
//! currently-running chain bypass the mailbox entirely and run inline —
//! the one carve-out that lets a handler call back into itself without
//! deadlocking behind its own in-flight turn.
//!
//! `OnActivate`/`OnDeactivate`/`OnReminder`/`OnStreamMessage` are not a
//! second `dyn` mechanism: they are ordinary [`MethodTable`] entries under
//! reserved method names, optional (a missing hook is a no-op, not an
//! error) so a behavior only pays for the hooks it registers.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{trace, warn};

// Layer 3: Internal module imports
use crate::mailbox::{AtomicMetrics, BoundedMailbox, BoundedMailboxSender, MailboxReceiver, MailboxSender};
use crate::message::{ChainId, Message, MessageEnvelope};
use crate::proxy::dispatch::MethodTable;
use crate::proxy::error::ProxyError;
use crate::util::ActorKey;

/// Reserved method name for the activation hook run once before an
/// activation's first queued call.
const ON_ACTIVATE: &str = "__on_activate";
/// Reserved method name for the activation hook run after the turn loop
/// drains for good (idle timeout or explicit stop).
const ON_DEACTIVATE: &str = "__on_deactivate";
/// Reserved method name a fired reminder is delivered under.
pub const ON_REMINDER: &str = "__on_reminder";
/// Reserved method name an implicit stream subscription delivers under.
pub const ON_STREAM_MESSAGE: &str = "__on_stream_message";

/// Default per-activation mailbox capacity, matching the spec's default.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;
/// Default idle period with an empty mailbox before an activation deactivates.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// One queued call: the method and opaque arguments, plus a reply channel
/// the turn loop completes exactly once.
///
/// Holds its reply sender behind `Arc<Mutex<Option<_>>>` rather than a bare
/// `oneshot::Sender` so the envelope carrying it can satisfy
/// [`Message`]'s `Clone` bound; in practice a `VirtualCall` is never
/// actually cloned more than once in flight, since the mailbox hands each
/// envelope to exactly one turn-loop iteration.
pub struct VirtualCall {
    method_name: String,
    args: Bytes,
    reply: Arc<Mutex<Option<oneshot::Sender<Result<Bytes, ProxyError>>>>>,
}

impl VirtualCall {
    fn new(method_name: String, args: Bytes, reply: oneshot::Sender<Result<Bytes, ProxyError>>) -> Self {
        Self {
            method_name,
            args,
            reply: Arc::new(Mutex::new(Some(reply))),
        }
    }

    fn complete(&self, result: Result<Bytes, ProxyError>) {
        if let Some(tx) = self.reply.lock().take() {
            let _ = tx.send(result);
        }
    }
}

impl Clone for VirtualCall {
    fn clone(&self) -> Self {
        Self {
            method_name: self.method_name.clone(),
            args: self.args.clone(),
            reply: Arc::clone(&self.reply),
        }
    }
}

impl fmt::Debug for VirtualCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualCall")
            .field("method_name", &self.method_name)
            .field("args_len", &self.args.len())
            .finish()
    }
}

impl Message for VirtualCall {
    const MESSAGE_TYPE: &'static str = "__virtual_call";
}

/// Where one activation currently sits in
/// `Uninstantiated -> Activating -> Idle <-> Processing -> Deactivating -> Gone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// No activation exists for this key yet.
    Uninstantiated,
    /// `OnActivate` is running; no call has been dequeued yet.
    Activating,
    /// Activated, mailbox empty, waiting for the next call or idle timeout.
    Idle,
    /// A handler (or hook) is currently running.
    Processing,
    /// `OnDeactivate` is running; the mailbox no longer accepts new calls.
    Deactivating,
    /// The turn loop has exited; a later call re-activates under a fresh instance.
    Gone,
}

struct ActivationHandle {
    sender: BoundedMailboxSender<VirtualCall, AtomicMetrics>,
    current_chain: Arc<Mutex<Option<ChainId>>>,
    state: Arc<Mutex<ActivationState>>,
}

async fn invoke_method(dispatch: &MethodTable, key: &ActorKey, method_name: &str, args: Bytes) -> Result<Bytes, ProxyError> {
    let handler = dispatch
        .get(&key.actor_type, method_name)
        .ok_or_else(|| ProxyError::UnknownMethod {
            actor_type: key.actor_type.as_str().to_string(),
            method_name: method_name.to_string(),
        })?;
    handler(key.actor_id.clone(), args).await
}

async fn invoke_hook(dispatch: &MethodTable, key: &ActorKey, hook: &str, args: Bytes) {
    if let Some(handler) = dispatch.get(&key.actor_type, hook) {
        if let Err(error) = handler(key.actor_id.clone(), args).await {
            warn!(actor = %key, hook, %error, "activation hook failed");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_turn_loop(
    key: ActorKey,
    mut mailbox: BoundedMailbox<VirtualCall, AtomicMetrics>,
    dispatch: MethodTable,
    idle_timeout: Duration,
    state: Arc<Mutex<ActivationState>>,
    current_chain: Arc<Mutex<Option<ChainId>>>,
    activations: Arc<DashMap<ActorKey, Arc<ActivationHandle>>>,
) {
    tokio::spawn(async move {
        *state.lock() = ActivationState::Activating;
        trace!(actor = %key, "activating");
        invoke_hook(&dispatch, &key, ON_ACTIVATE, Bytes::new()).await;
        *state.lock() = ActivationState::Idle;

        loop {
            match tokio::time::timeout(idle_timeout, mailbox.recv()).await {
                Ok(Some(envelope)) => {
                    *current_chain.lock() = Some(envelope.chain_id);
                    *state.lock() = ActivationState::Processing;
                    let call = envelope.payload;
                    let result = invoke_method(&dispatch, &key, &call.method_name, call.args.clone()).await;
                    call.complete(result);
                    *current_chain.lock() = None;
                    *state.lock() = ActivationState::Idle;
                }
                Ok(None) => break,
                Err(_) => {
                    trace!(actor = %key, "idle timeout elapsed, deactivating");
                    break;
                }
            }
        }

        *state.lock() = ActivationState::Deactivating;
        invoke_hook(&dispatch, &key, ON_DEACTIVATE, Bytes::new()).await;
        *state.lock() = ActivationState::Gone;
        activations.remove(&key);
    });
}

/// Owns every local activation's turn-loop task, keyed by `ActorKey`.
///
/// Shared by [`crate::proxy::ActorProxy`] (for ordinary method calls),
/// the reminder poller, and implicit stream-message delivery, so all
/// three paths serialize against the same per-actor turn loop rather than
/// each racing its own.
pub struct ActivationRegistry {
    dispatch: MethodTable,
    mailbox_capacity: usize,
    idle_timeout: Duration,
    activations: Arc<DashMap<ActorKey, Arc<ActivationHandle>>>,
}

impl ActivationRegistry {
    /// Build a registry dispatching through `dispatch`, using the spec's
    /// default mailbox capacity and idle timeout.
    pub fn new(dispatch: MethodTable) -> Self {
        Self::with_capacity_and_idle_timeout(dispatch, DEFAULT_MAILBOX_CAPACITY, DEFAULT_IDLE_TIMEOUT)
    }

    /// Build a registry with an overridden mailbox capacity and idle timeout.
    pub fn with_capacity_and_idle_timeout(dispatch: MethodTable, mailbox_capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            dispatch,
            mailbox_capacity,
            idle_timeout,
            activations: Arc::new(DashMap::new()),
        }
    }

    /// Current lifecycle state of `key`'s activation.
    ///
    /// Returns [`ActivationState::Uninstantiated`] if no call has ever
    /// reached this key (or its prior activation has already gone).
    pub fn state(&self, key: &ActorKey) -> ActivationState {
        self.activations
            .get(key)
            .map(|handle| *handle.state.lock())
            .unwrap_or(ActivationState::Uninstantiated)
    }

    fn activation_for(&self, key: &ActorKey) -> Arc<ActivationHandle> {
        if let Some(existing) = self.activations.get(key) {
            return Arc::clone(existing.value());
        }

        let state = Arc::new(Mutex::new(ActivationState::Uninstantiated));
        let current_chain = Arc::new(Mutex::new(None));
        let (mailbox, sender) = BoundedMailbox::new(self.mailbox_capacity);
        let handle = Arc::new(ActivationHandle {
            sender,
            current_chain: Arc::clone(&current_chain),
            state: Arc::clone(&state),
        });

        match self.activations.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&handle));
                spawn_turn_loop(
                    key.clone(),
                    mailbox,
                    self.dispatch.clone(),
                    self.idle_timeout,
                    state,
                    current_chain,
                    Arc::clone(&self.activations),
                );
                handle
            }
        }
    }

    /// Route `method_name` to `key`'s activation, serialized through its
    /// turn loop unless `chain_id` matches the chain currently running on
    /// that activation, in which case the call runs inline.
    pub async fn dispatch(&self, key: ActorKey, method_name: &str, args: Bytes, chain_id: ChainId) -> Result<Bytes, ProxyError> {
        let handle = self.activation_for(&key);

        if *handle.current_chain.lock() == Some(chain_id) {
            trace!(actor = %key, %chain_id, method = method_name, "reentrant call bypasses the mailbox");
            return invoke_method(&self.dispatch, &key, method_name, args).await;
        }

        let (tx, rx) = oneshot::channel();
        let call = VirtualCall::new(method_name.to_string(), args, tx);
        let envelope =
            MessageEnvelope::new(call).with_chain(chain_id, vec![(key.actor_type.clone(), key.actor_id.clone())]);

        handle
            .sender
            .send(envelope)
            .await
            .map_err(|_| ProxyError::ActivationUnavailable(key.clone()))?;
        rx.await.map_err(|_| ProxyError::ActivationUnavailable(key))?
    }
}

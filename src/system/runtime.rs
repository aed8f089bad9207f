//! `QuarkRuntime`: the process-wide composition root.
//!
//! A silo process constructs exactly one [`QuarkRuntime`] from a
//! [`SystemConfig`] and its provider set — the persistence, membership,
//! directory, reminder and transport implementations for this
//! deployment. The runtime owns the background tasks that keep the
//! placement ring in sync with cluster membership and that deliver due
//! reminders to their actor's `OnReminder` hook; actor registries and supervision
//! trees are constructed independently and wired to the runtime's
//! providers by the host, following the same dependency-injection
//! style already used by [`super::actor_system::ActorSystem`]. Reminder
//! and implicit stream delivery both dispatch through the same
//! [`crate::proxy::ActivationRegistry`] an [`crate::proxy::ActorProxy`]
//! uses for ordinary calls, built from the method table passed to
//! [`QuarkRuntime::new`].

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

// Layer 3: Internal module imports
use super::SystemConfig;
use crate::actor::{ActorHost, QuarkActorHost};
use crate::cluster::{MembershipEvent, MembershipStore};
use crate::directory::Directory;
use crate::persistence::{ReminderStore, StateStore};
use crate::placement::{ConsistentHashRing, PlacementError};
use crate::proxy::{ActivationRegistry, MethodTable, ON_REMINDER, ON_STREAM_MESSAGE};
use crate::streams::{ImplicitConsumerDispatch, StreamBackpressure, StreamBroker, StreamId};
use crate::transport::Transport;
use crate::util::{ActorId, ActorKey, ActorType, SiloId};

/// Wire shape of a reminder delivered to its actor's `OnReminder` hook.
///
/// JSON-encoded and passed as the `args` blob of the reserved
/// `__on_reminder` method, the same path an ordinary `invoke` call
/// takes through the actor's turn loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiredReminder {
    /// The actor the reminder was registered against.
    pub key: ActorKey,
    /// The reminder's name.
    pub name: String,
    /// The reminder's opaque payload.
    pub payload: Vec<u8>,
}

/// Wire shape handed to an actor's `OnStreamMessage` hook: identifies
/// which stream the payload arrived on so one actor can implicitly
/// consume several namespaces and still tell them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDelivery {
    /// The namespace the message was published under.
    pub namespace: String,
    /// The key partitioning that namespace (this consumer's own key).
    pub key: String,
    /// The published payload.
    pub payload: Vec<u8>,
}

/// Routes [`StreamBroker::publish_keyed`]'s implicit-consumer fan-out
/// into the same [`ActivationRegistry`] turn loops ordinary `invoke`
/// calls use, so a stream message and a concurrent method call on the
/// same actor never race each other.
struct RuntimeStreamDispatch {
    activations: Arc<ActivationRegistry>,
}

#[async_trait::async_trait]
impl ImplicitConsumerDispatch for RuntimeStreamDispatch {
    async fn deliver(&self, consumer_type: &ActorType, stream_id: &StreamId, payload: bytes::Bytes) {
        let actor_id = match ActorId::new(stream_id.key.clone()) {
            Ok(id) => id,
            Err(error) => {
                warn!(%error, stream = %stream_id, "implicit consumer key is not a valid actor id, dropping");
                return;
            }
        };
        let key = ActorKey::new(consumer_type.clone(), actor_id);
        let delivery = StreamDelivery {
            namespace: stream_id.namespace.clone(),
            key: stream_id.key.clone(),
            payload: payload.to_vec(),
        };
        let encoded = match serde_json::to_vec(&delivery) {
            Ok(bytes) => bytes::Bytes::from(bytes),
            Err(error) => {
                warn!(%error, stream = %stream_id, "failed to encode stream delivery, dropping");
                return;
            }
        };
        if let Err(error) = self
            .activations
            .dispatch(key, ON_STREAM_MESSAGE, encoded, crate::message::ChainId::new_root())
            .await
        {
            warn!(%error, stream = %stream_id, "OnStreamMessage delivery failed");
        }
    }
}

/// The provider set a [`QuarkRuntime`] is constructed from.
///
/// Grouping these behind one struct keeps `QuarkRuntime::new`'s
/// signature from growing a new positional argument every time a
/// provider is added.
pub struct Providers<St, Me, Di, Re, Tr> {
    /// Durable per-actor state (this).
    pub state_store: Arc<St>,
    /// Cluster heartbeat tracking (this).
    pub membership: Arc<Me>,
    /// Actor-to-silo placement records (this).
    pub directory: Arc<Di>,
    /// Durable scheduled callbacks (this).
    pub reminders: Arc<Re>,
    /// Inter-silo request carrier (this).
    pub transport: Arc<Tr>,
}

/// The process-wide runtime composition root.
///
/// Generic over the five provider traits so a deployment can swap the
/// in-memory reference implementations for real backends (a gossip
/// membership protocol, a networked transport, a replicated state
/// store) without the runtime itself changing.
pub struct QuarkRuntime<St, Me, Di, Re, Tr> {
    self_silo: SiloId,
    config: SystemConfig,
    state_store: Arc<St>,
    membership: Arc<Me>,
    directory: Arc<Di>,
    reminders: Arc<Re>,
    transport: Arc<Tr>,
    ring: RwLock<ConsistentHashRing>,
    streams: Arc<StreamBroker>,
    activations: Arc<ActivationRegistry>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl<St, Me, Di, Re, Tr> QuarkRuntime<St, Me, Di, Re, Tr>
where
    St: StateStore + 'static,
    Me: MembershipStore + 'static,
    Di: Directory + 'static,
    Re: ReminderStore + 'static,
    Tr: Transport + 'static,
{
    /// Construct a runtime from its configuration, provider set, and the
    /// method table its actor behaviors were registered against.
    ///
    /// `dispatch` backs the [`ActivationRegistry`] this runtime drives its
    /// reminder poller and implicit stream delivery through; hand the same
    /// table to any [`crate::proxy::ActorProxy`] this process also
    /// constructs (via [`crate::proxy::ActorProxy::with_activations`]
    /// sharing [`Self::activations`]) so every call path serializes
    /// against the same per-actor turn loops.
    ///
    /// Does not start any background task; call [`Self::start`] once
    /// the runtime is wrapped in an `Arc`.
    pub fn new(self_silo: SiloId, config: SystemConfig, providers: Providers<St, Me, Di, Re, Tr>, dispatch: MethodTable) -> Self {
        let streams = Arc::new(StreamBroker::new(
            config.default_mailbox_capacity,
            StreamBackpressure::Block,
        ));
        let activations = Arc::new(ActivationRegistry::new(dispatch));
        streams.set_implicit_dispatch(Arc::new(RuntimeStreamDispatch {
            activations: Arc::clone(&activations),
        }));
        Self {
            self_silo,
            config,
            state_store: providers.state_store,
            membership: providers.membership,
            directory: providers.directory,
            reminders: providers.reminders,
            transport: providers.transport,
            ring: RwLock::new(ConsistentHashRing::new()),
            streams,
            activations,
            tasks: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// This process's own silo identity.
    pub fn self_silo(&self) -> &SiloId {
        &self.self_silo
    }

    /// The configuration this runtime was built from.
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// The durable per-actor state provider.
    pub fn state_store(&self) -> &Arc<St> {
        &self.state_store
    }

    /// The cluster membership provider.
    pub fn membership(&self) -> &Arc<Me> {
        &self.membership
    }

    /// The actor placement directory.
    pub fn directory(&self) -> &Arc<Di> {
        &self.directory
    }

    /// The durable reminder provider.
    pub fn reminders(&self) -> &Arc<Re> {
        &self.reminders
    }

    /// The inter-silo transport.
    pub fn transport(&self) -> &Arc<Tr> {
        &self.transport
    }

    /// The stream broker backing explicit and implicit reactive
    /// subscriptions.
    pub fn streams(&self) -> &Arc<StreamBroker> {
        &self.streams
    }

    /// The activation registry this runtime's reminder poller and
    /// implicit stream delivery dispatch through. Share this with an
    /// [`crate::proxy::ActorProxy`] via `with_activations` so ordinary
    /// method calls serialize against the same turn loops.
    pub fn activations(&self) -> &Arc<ActivationRegistry> {
        &self.activations
    }

    /// Build the durable-state/reminder capability a freshly-activated
    /// virtual actor's [`crate::actor::ActorContext`] attaches via
    /// `with_host`, scoped to `key`.
    ///
    /// This is the piece that lets a handler's `ctx.load_state(...)`/
    /// `ctx.register_reminder(...)` calls reach this runtime's actual
    /// `St`/`Re` providers instead of the [`crate::actor::UnconfiguredHost`]
    /// default every bare `ActorContext::new` starts with.
    pub fn host_for(&self, key: ActorKey) -> Arc<dyn ActorHost> {
        Arc::new(QuarkActorHost::new(key, self.state_store.clone(), self.reminders.clone()))
    }

    /// Determine which silo currently owns `(actor_type, actor_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NoSilosAvailable`] if the ring has not
    /// observed any alive silo yet.
    pub fn place(&self, actor_type: &ActorType, actor_id: &ActorId) -> Result<SiloId, PlacementError> {
        self.ring.read().place(actor_type, actor_id)
    }

    /// Record this process's own heartbeat, seed the ring from current
    /// membership, and spawn the membership-watch and reminder-poll
    /// background tasks.
    ///
    /// Must be called on an `Arc<QuarkRuntime<..>>`: the spawned tasks
    /// hold a clone of the `Arc` for the runtime's lifetime.
    pub async fn start(self: &Arc<Self>) -> Result<(), crate::cluster::MembershipError> {
        self.membership.heartbeat(self.self_silo.clone()).await?;
        {
            let mut ring = self.ring.write();
            for silo in self.membership.alive_silos().await {
                ring.add_silo(silo);
            }
        }

        let mut tasks = Vec::with_capacity(2);
        tasks.push(self.clone().spawn_membership_watch());
        tasks.push(self.clone().spawn_reminder_poll());
        *self.tasks.lock() = tasks;
        Ok(())
    }

    fn spawn_membership_watch(self: Arc<Self>) -> JoinHandle<()> {
        let mut events = self.membership.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(MembershipEvent::SiloJoined(silo)) => {
                        info!(silo = %silo, "placement ring: silo joined");
                        self.ring.write().add_silo(silo);
                    }
                    Ok(MembershipEvent::SiloLeft(silo)) => {
                        warn!(silo = %silo, "placement ring: silo left");
                        self.ring.write().remove_silo(&silo);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "membership watcher lagged, ring may be briefly stale");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_reminder_poll(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.reminder_poll_interval;
        let leeway = self.config.reminder_leeway;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let due = self.reminders.select_due(Utc::now(), leeway).await;
                for reminder in due {
                    let fired = FiredReminder {
                        key: reminder.key.clone(),
                        name: reminder.name.clone(),
                        payload: reminder.payload.to_vec(),
                    };
                    let encoded = match serde_json::to_vec(&fired) {
                        Ok(bytes) => bytes::Bytes::from(bytes),
                        Err(error) => {
                            warn!(%error, "failed to encode fired reminder, skipping");
                            continue;
                        }
                    };
                    if let Err(error) = self
                        .activations
                        .dispatch(reminder.key.clone(), ON_REMINDER, encoded, crate::message::ChainId::new_root())
                        .await
                    {
                        warn!(actor = %reminder.key, name = %reminder.name, %error, "OnReminder delivery failed");
                    }

                    match reminder.period {
                        Some(period) => {
                            #[allow(clippy::unwrap_used)]
                            let next = Utc::now()
                                + chrono::Duration::from_std(period).unwrap_or(chrono::Duration::zero());
                            let _ = self
                                .reminders
                                .reschedule(&reminder.key, &reminder.name, next)
                                .await;
                        }
                        None => {
                            let _ = self.reminders.unregister(&reminder.key, &reminder.name).await;
                        }
                    }
                }
            }
        })
    }

    /// Abort the membership-watch and reminder-poll background tasks.
    ///
    /// Providers and the stream broker are left intact; this only
    /// stops the runtime's own tasks, mirroring
    /// [`super::actor_system::ActorSystem::force_shutdown`]'s
    /// abort-and-stop shape rather than a graceful drain, since neither
    /// background task holds state worth draining.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

//! Main actor system implementation with broker-routed message delivery.

// Layer 1: Standard library
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::{spawn, JoinHandle};
use tokio::time::{sleep, timeout};

// Layer 3: Internal
use super::{builder::ActorSpawnBuilder, SystemConfig, SystemError};
use crate::actor::{Actor, ActorContext, ActorLifecycle, ActorState, ErrorAction};
use crate::broker::MessageBroker;
use crate::mailbox::{AtomicMetrics, MailboxReceiver, UnboundedMailbox, UnboundedMailboxSender};
use crate::message::{Message, MessageEnvelope};
use crate::util::{ActorAddress, InstanceId};

/// System state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SystemState {
    /// System is running normally
    Running,
    /// Graceful shutdown in progress
    ShuttingDown,
    /// System has stopped
    Stopped,
}

/// Internal actor metadata.
#[allow(dead_code)] // Fields reserved for future actor management features
struct ActorMetadata<M: Message> {
    id: InstanceId,
    address: ActorAddress,
    name: Option<String>,
    spawned_at: DateTime<Utc>,
    task_handle: JoinHandle<()>,
    _marker: std::marker::PhantomData<M>,
}

/// Main actor system managing actor lifecycle.
///
/// The system is generic over the message type and the broker implementation,
/// following a dependency injection pattern.
///
/// # Architecture: Broker-Routed Delivery
///
/// Each spawned actor gets an unbounded mailbox whose sender is registered
/// with the injected broker under the actor's address. Sends addressed at
/// that actor therefore resolve straight to its mailbox through the broker's
/// own registry, with no separate routing task in the system itself:
///
/// ```text
/// Actor A → ActorContext.broker().send(envelope) → Broker registry lookup
///                                                        ↓
///                                                  Actor B's mailbox
/// ```
///
/// # Type Parameters
///
/// * `M` - The message type used by all actors in this system
/// * `B` - The message broker implementation (injected via dependency injection)
///
/// # Examples
///
/// ```rust,ignore
/// use quark::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), SystemError> {
///     // Create broker and inject into system
///     let broker = InMemoryMessageBroker::new();
///     let system = ActorSystem::new(SystemConfig::default(), broker);
///     
///     // All actors use the injected broker
///     let addr = system.spawn()
///         .with_name("worker")
///         .spawn(my_actor)
///         .await?;
///     
///     system.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct ActorSystem<M: Message, B: MessageBroker<M>> {
    pub(crate) inner: Arc<ActorSystemInner<M, B>>,
}

pub(crate) struct ActorSystemInner<M: Message, B: MessageBroker<M>> {
    pub(crate) config: SystemConfig,
    pub(crate) broker: B, // Dependency injection for dependency injection
    actors: RwLock<HashMap<ActorAddress, ActorMetadata<M>>>,
    pub(crate) state: RwLock<SystemState>,
}

impl<M, B> ActorSystem<M, B>
where
    M: Message + serde::Serialize,
    B: MessageBroker<M, Sender = UnboundedMailboxSender<M, AtomicMetrics>>
        + Clone
        + Send
        + Sync
        + 'static,
{
    /// Get the system configuration.
    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    /// Create a new actor system with dependency injection.
    ///
    /// # Arguments
    ///
    /// * `config` - System configuration
    /// * `broker` - Message broker implementation (injected)
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let broker = InMemoryMessageBroker::new();
    /// let system = ActorSystem::new(SystemConfig::default(), broker);
    /// ```
    pub fn new(config: SystemConfig, broker: B) -> Self {
        let inner = Arc::new(ActorSystemInner {
            config,
            broker,
            actors: RwLock::new(HashMap::new()),
            state: RwLock::new(SystemState::Running),
        });

        Self { inner }
    }

    /// Get the number of active actors.
    pub fn actor_count(&self) -> usize {
        self.inner.actors.read().len()
    }

    /// Check if system is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        *self.inner.state.read() != SystemState::Running
    }

    /// Gracefully shutdown the system.
    ///
    /// Waits for all actors to finish processing before returning.
    pub async fn shutdown(&self) -> Result<(), SystemError> {
        // Set shutting down state
        {
            let mut state = self.inner.state.write();
            if *state != SystemState::Running {
                return Err(SystemError::ShuttingDown);
            }
            *state = SystemState::ShuttingDown;
        }

        // Wait for all actors to finish (with timeout)
        let timeout_duration = self.inner.config.shutdown_timeout;
        let result = timeout(timeout_duration, self.wait_for_actors()).await;

        match result {
            Ok(()) => {
                *self.inner.state.write() = SystemState::Stopped;
                Ok(())
            }
            Err(_) => Err(SystemError::ShutdownTimeout(timeout_duration)),
        }
    }

    /// Wait for all actors to finish.
    async fn wait_for_actors(&self) {
        loop {
            let actor_count = self.inner.actors.read().len();

            if actor_count == 0 {
                break;
            }

            // Wait a bit
            sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    /// Force immediate shutdown without waiting.
    pub async fn force_shutdown(&self) {
        *self.inner.state.write() = SystemState::Stopped;

        // Abort all actor tasks and drop their broker registrations
        let mut actors = self.inner.actors.write();
        for (address, metadata) in actors.drain() {
            metadata.task_handle.abort();
            let _ = self.inner.broker.unregister_actor(&address);
        }
    }

    /// Internal: Spawn actor with full configuration.
    ///
    /// Called by ActorSpawnBuilder.
    pub(crate) async fn spawn_actor_internal<A>(
        &self,
        actor: A,
        name: Option<String>,
        _mailbox_capacity: usize,
    ) -> Result<ActorAddress, SystemError>
    where
        A: Actor<Message = M> + Send + 'static,
    {
        // Check if shutting down
        if self.is_shutting_down() {
            return Err(SystemError::ShuttingDown);
        }

        // Check actor limit
        if self.inner.config.max_actors > 0 {
            let current = self.actor_count();
            if current >= self.inner.config.max_actors {
                return Err(SystemError::ActorLimitExceeded {
                    current,
                    max: self.inner.config.max_actors,
                });
            }
        }

        // Create actor ID and address
        let actor_id = InstanceId::new();
        let address = if let Some(ref n) = name {
            ActorAddress::named(n)
        } else {
            ActorAddress::Anonymous { id: actor_id }
        };

        // Create unbounded mailbox (bounded not yet supported in this system)
        // and register its sender with the broker so addressed sends resolve
        // straight to it.
        let (mailbox, mailbox_sender) = UnboundedMailbox::<M, AtomicMetrics>::new();
        self.inner
            .broker
            .register_actor(address.clone(), mailbox_sender)
            .map_err(|error| {
                SystemError::SpawnFailed(format!("failed to register actor with broker: {error}"))
            })?;

        // Create actor context
        let context = ActorContext::new(address.clone(), self.inner.broker.clone());

        // Spawn actor task
        let task_handle = self.spawn_actor_task(actor, mailbox, context);

        // Store metadata
        let metadata = ActorMetadata {
            id: actor_id,
            address: address.clone(),
            name,
            spawned_at: Utc::now(),
            task_handle,
            _marker: std::marker::PhantomData,
        };

        self.inner.actors.write().insert(address.clone(), metadata);

        Ok(address)
    }

    /// Spawn the actor task.
    fn spawn_actor_task<A>(
        &self,
        mut actor: A,
        mut mailbox: UnboundedMailbox<M, AtomicMetrics>,
        mut context: ActorContext<M, B>,
    ) -> JoinHandle<()>
    where
        A: Actor<Message = M> + Send + 'static,
    {
        let address = context.address().clone();
        let inner = Arc::clone(&self.inner);
        spawn(async move {
            let mut lifecycle = ActorLifecycle::new();

            // Labeled block so every exit path (early stop, normal drain)
            // falls through to the registry cleanup below instead of
            // leaking the actor's entry in `inner.actors` / the broker.
            'activation: {
                // Call pre_start lifecycle hook, restarting in place on a
                // Restart directive since there is no parent supervisor wired
                // into this plain system to hand the fault to.
                loop {
                    match actor.pre_start(&mut context).await {
                        Ok(()) => break,
                        Err(error) => {
                            let action = actor.on_error(error, &mut context).await;
                            match action {
                                ErrorAction::Stop => break 'activation,
                                ErrorAction::Escalate => {
                                    tracing::error!(address = %address, "actor escalated during pre_start, stopping");
                                    break 'activation;
                                }
                                ErrorAction::Restart => {
                                    lifecycle.transition_to(ActorState::Starting);
                                    continue;
                                }
                                ErrorAction::Resume => break,
                            }
                        }
                    }
                }
                lifecycle.transition_to(ActorState::Running);

                // Actor message loop
                while let Some(envelope) = mailbox.recv().await {
                    context.begin_call(&envelope);
                    let message = envelope.payload;

                    match actor.handle_message(message, &mut context).await {
                        Ok(()) => {
                            // Message handled successfully
                        }
                        Err(error) => {
                            let action = actor.on_error(error, &mut context).await;
                            match action {
                                ErrorAction::Stop => {
                                    // Actor requested stop
                                    break;
                                }
                                ErrorAction::Restart => {
                                    // Discard in-memory state by re-running pre_start on
                                    // the same instance, same address; a persistent actor
                                    // reloads its durable state there.
                                    lifecycle.transition_to(ActorState::Stopping);
                                    context.stop_timers();
                                    let _ = actor.post_stop(&mut context).await;
                                    lifecycle.transition_to(ActorState::Starting);
                                    if let Err(restart_error) = actor.pre_start(&mut context).await {
                                        let restart_action =
                                            actor.on_error(restart_error, &mut context).await;
                                        if !matches!(restart_action, ErrorAction::Resume) {
                                            tracing::warn!(
                                                address = %address,
                                                "actor failed to restart, stopping"
                                            );
                                            break;
                                        }
                                    }
                                    lifecycle.transition_to(ActorState::Running);
                                    continue;
                                }
                                ErrorAction::Escalate => {
                                    tracing::error!(address = %address, "actor escalated, stopping");
                                    break;
                                }
                                ErrorAction::Resume => {
                                    // Continue processing next message
                                    continue;
                                }
                            }
                        }
                    }
                }

                // Call post_stop lifecycle hook
                lifecycle.transition_to(ActorState::Stopping);
                context.stop_timers();
                let _ = actor.post_stop(&mut context).await;
                lifecycle.transition_to(ActorState::Stopped);
            }

            let _ = inner.broker.unregister_actor(&address);
            inner.actors.write().remove(&address);
        })
    }

    /// Create a builder for spawning actors.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let address = system.spawn()
    ///     .with_name("worker")
    ///     .with_mailbox_capacity(1000)
    ///     .spawn(my_actor)
    ///     .await?;
    /// ```
    pub fn spawn(&self) -> ActorSpawnBuilder<M, B> {
        ActorSpawnBuilder::new(self.clone())
    }
}

impl<M: Message, B: MessageBroker<M>> Clone for ActorSystem<M, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

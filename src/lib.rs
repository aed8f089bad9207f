//! # quark - a distributed virtual-actor runtime
//!
//! Quark hosts large populations of addressable, single-threaded stateful
//! actors across a set of cooperating silo processes. It routes messages to
//! actors by logical identity, persists their state, recovers them after
//! failure, and exposes them through typed proxies that behave the same
//! whether the callee is in-process or on another host.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use quark::prelude::*;
//! use async_trait::async_trait;
//!
//! // 1. Define your message type
//! #[derive(Debug, Clone)]
//! enum CounterMsg {
//!     Increment,
//!     GetCount(tokio::sync::oneshot::Sender<u64>),
//! }
//!
//! impl Message for CounterMsg {
//!     const MESSAGE_TYPE: &'static str = "counter";
//! }
//!
//! // 2. Define your actor
//! struct CounterActor {
//!     count: u64,
//! }
//!
//! // 3. Implement the Actor trait
//! #[async_trait]
//! impl Actor for CounterActor {
//!     type Message = CounterMsg;
//!     type Error = std::io::Error;
//!
//!     async fn handle_message<B: MessageBroker<Self::Message>>(
//!         &mut self,
//!         msg: Self::Message,
//!         ctx: &mut ActorContext<Self::Message, B>,
//!     ) -> Result<(), Self::Error> {
//!         match msg {
//!             CounterMsg::Increment => self.count += 1,
//!             CounterMsg::GetCount(reply) => {
//!                 let _ = reply.send(self.count);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! // 4. Spawn and use your actor
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let system = ActorSystem::new(SystemConfig::default());
//!     let actor = CounterActor { count: 0 };
//!     let address = system.spawn(actor).await?;
//!
//!     // Send messages
//!     system.send(address, CounterMsg::Increment).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Core Features
//!
//! ## Location Transparency
//! - A typed [`proxy`] resolves `(actor type, actor id)` through the
//!   [`directory`], short-circuiting to a local mailbox or framing a call
//!   over the [`transport`] when the target lives on another silo.
//! - Consistent-hash [`placement`] with virtual nodes keeps actor-to-silo
//!   movement proportional to the size of a membership change, not the
//!   size of the actor population.
//!
//! ## Turn-Based Actors
//! - Each actor processes one message at a time from its [`mailbox`]; no
//!   two handlers of the same actor run concurrently unless the actor
//!   opts into chain-scoped reentrancy.
//! - Generic constraints over trait objects wherever the call site is
//!   statically known; `dyn` is reserved for genuinely heterogeneous
//!   dispatch tables (method-name routing, per-silo transport handlers).
//!
//! ## Fault Tolerance
//! - [`supervisor`] trees route `FailureContext`s to a parent, which
//!   returns `Resume | Restart | Stop | Escalate`.
//! - [`monitoring`] gives the same ambient event recording to actor,
//!   mailbox, broker and supervision activity, with a zero-cost no-op
//!   implementation as the default.
//!
//! ## Durable State and Scheduling
//! - [`persistence`] provides optimistic-concurrency state storage
//!   (version/ETag CAS) and a reminder service that re-activates dormant
//!   actors on schedule, surviving silo restarts.
//! - [`streams`] and [`saga`] build pub/sub fan-out, windowed reactive
//!   pipelines, and multi-step compensating workflows on top of the same
//!   mailbox and persistence primitives.
//!
//! # Module Organization
//!
//! ## Core Actor System
//! - [`actor`] - Actor trait, lifecycle, and context for message handling
//! - [`message`] - Message trait, envelopes, and priority system
//! - [`mailbox`] - Message queuing with backpressure control
//! - [`broker`] - Message routing and pub/sub infrastructure
//!
//! ## Distributed Runtime
//! - [`cluster`] - Heartbeat-based membership and join/leave events
//! - [`directory`] - Actor-to-silo placement records with CAS semantics
//! - [`placement`] - Consistent-hash ring over the alive silo set
//! - [`transport`] / [`proxy`] - Request/response framing and typed,
//!   location-transparent invocation
//!
//! ## Fault Tolerance
//! - [`supervisor`] - Supervision trees and restart strategies
//! - [`monitoring`] - Event tracking and metrics for observability
//!
//! ## Persistence and Workflows
//! - [`persistence`] - State store and reminder service contracts
//! - [`streams`] - Pub/sub broker and windowed reactive operators
//! - [`saga`] - Ordered, compensatable step pipelines
//!
//! ## Infrastructure
//! - [`system`] - `ActorSystem`/`QuarkRuntime` composition and configuration
//! - [`util`] - Identity types (`ActorId`, `ActorType`, `SiloId`, …)
//!
//! # Architecture Principles
//!
//! - **Separation of concerns**: an `Actor` defines message-handling logic
//!   only; supervision, persistence and streaming are capabilities a
//!   runtime-provided context grants, not base classes an actor inherits.
//! - **Dependency injection**: stores, transports and brokers are generic
//!   parameters, so a deployment can swap in real backends without the
//!   runtime itself changing, and tests can run fully in-memory.
//! - **No hidden singletons**: a silo constructs one `QuarkRuntime` (or
//!   `ActorSystem`) explicitly from its provider set; nothing here reaches
//!   for global state.
//!
//! # See Also
//!
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model) - Theoretical foundation
//! - [Consistent hashing (Wikipedia)](https://en.wikipedia.org/wiki/Consistent_hashing) - Placement foundation

pub mod actor;
pub mod broker;
pub mod cluster;
pub mod directory;
pub mod mailbox;
pub mod message;
pub mod monitoring;
pub mod persistence;
pub mod placement;
pub mod proxy;
pub mod saga;
pub mod streams;
pub mod supervisor;
pub mod system;
pub mod transport;
pub mod util;

// Re-export commonly used types
pub use actor::{Actor, ActorContext, ActorLifecycle, ActorState, ErrorAction};
pub use broker::{ActorRegistry, BrokerError, InMemoryMessageBroker, MessageBroker, PoolStrategy};
pub use cluster::{InMemoryMembershipStore, MembershipError, MembershipEvent, MembershipStore};
pub use directory::{Directory, DirectoryError, DirectoryEntry, InMemoryDirectory, Version};
pub use mailbox::{
    BackpressureStrategy, BoundedMailbox, BoundedMailboxSender, MailboxReceiver, MailboxSender,
};
pub use message::{Message, MessageEnvelope, MessagePriority};
pub use monitoring::{
    ActorEvent, ActorEventKind, BrokerEvent, BrokerEventKind, EventSeverity, InMemoryMonitor,
    MailboxEvent, MailboxEventKind, Monitor, MonitoringConfig, MonitoringError, MonitoringEvent,
    MonitoringSnapshot, NoopMonitor, SupervisionEvent, SupervisionEventKind, SystemEvent,
    SystemEventKind,
};
pub use persistence::{
    InMemoryReminderStore, InMemoryStateStore, Reminder, ReminderError, ReminderStore, StateKey,
    StateRecord, StateStore, StateStoreError, StateVersion,
};
pub use placement::{ConsistentHashRing, PlacementError};
pub use proxy::{
    ActivationRegistry, ActivationState, ActorProxy, MethodHandler, MethodTable, ProxyError, ON_REMINDER,
    ON_STREAM_MESSAGE,
};
pub use saga::{ClosureStep, SagaCoordinator, SagaError, SagaId, SagaState, SagaStatus};
pub use streams::{
    ImplicitConsumerDispatch, ImplicitRegistration, StreamBackpressure, StreamBroker, StreamBrokerError,
    StreamHandle, StreamId, StreamMetricsSnapshot, Window, WindowAssigner, WindowKind,
};
pub use supervisor::{
    Child, ChildHandle, ChildHealth, ChildId, ChildSpec, ChildState, OneForAll, OneForOne,
    RestForOne, RestartBackoff, RestartPolicy, ShutdownPolicy, SupervisionDecision,
    SupervisionStrategy, Supervisor, SupervisorError, SupervisorId, SupervisorNode, SupervisorTree,
};
pub use system::{
    ActorSpawnBuilder, ActorSystem, FiredReminder, Providers, QuarkRuntime, StreamDelivery, SystemConfig, SystemError,
};
pub use transport::{
    CancelFrame, ConnectionPool, LocalTransport, RequestFrame, ResponseFrame, ResponseOutcome,
    RetryPolicy, Transport, TransportError,
};
pub use util::{ActorAddress, ActorId, ActorKey, ActorType, InstanceId, MessageId, SiloId};

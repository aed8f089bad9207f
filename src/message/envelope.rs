//! Message envelope carrying a typed payload plus routing/causality metadata.

// Layer 1: Standard library imports
use std::fmt::{self, Debug};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
use super::traits::{Message, MessagePriority};
use crate::util::ids::{ActorAddress, ActorId, ActorType};

/// Correlates a request with its response across the transport and the
/// local short-circuit path alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh, random correlation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one routed call for tracing and idempotency purposes.
///
/// Distinct from [`CorrelationId`]: a `CorrelationId` links a request to its
/// eventual response across the transport and the local short-circuit path,
/// while a `RequestId` names the call itself, stable even if the same
/// `CorrelationId` is reused (e.g. a retried send keeps its `CorrelationId`
/// but mints a fresh `RequestId` per attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh, random request id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a causally-linked chain of nested calls.
///
/// Assigned once at the outermost call and threaded through every nested
/// call it causes. A handler already on the stack with a matching
/// `ChainId` is allowed to re-enter; anything else queues normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(Uuid);

impl ChainId {
    /// Start a new chain (used at the outermost call of a request).
    pub fn new_root() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `(ActorType, ActorId)` frames visited on the way to the current call,
/// outermost first. Used for diagnostics and reentrancy/cycle inspection.
pub type CausalityStack = Vec<(ActorType, ActorId)>;

/// Generic message envelope: a typed payload plus the metadata the runtime
/// needs to route, correlate, and bound the call regardless of payload type.
///
/// Two families of callers construct envelopes:
///
/// - The in-process mailbox/broker engine addresses activations by
///   [`ActorAddress`] and uses [`MessageEnvelope::new`], leaving the
///   cluster-wide `actor_type`/`actor_id` unset.
/// - The virtual-actor host and transport layer route by the
///   stable `(ActorType, ActorId)` pair and use
///   [`MessageEnvelope::for_actor`], which always sets both.
///
/// # Type Safety
///
/// The envelope is generic over the message type `M`; each actor's mailbox
/// is monomorphized for its own message type rather than boxing payloads
/// behind a trait object.
///
/// # Examples
///
/// ```rust
/// use quark::message::{Message, MessageEnvelope};
/// use quark::util::{ActorId, ActorType};
///
/// #[derive(Debug, Clone)]
/// struct Increment;
///
/// impl Message for Increment {
///     const MESSAGE_TYPE: &'static str = "increment";
/// }
///
/// let envelope = MessageEnvelope::for_actor(
///     Increment,
///     ActorType::new("counter").unwrap(),
///     ActorId::new("c1").unwrap(),
/// );
///
/// assert_eq!(envelope.message_type(), "increment");
/// assert!(!envelope.is_expired());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<M: Message> {
    /// The actual message payload.
    pub payload: M,

    /// Target actor type, set only by [`Self::for_actor`].
    pub actor_type: Option<ActorType>,

    /// Target actor id, set only by [`Self::for_actor`].
    pub actor_id: Option<ActorId>,

    /// In-process reply address, used by the mailbox/broker engine's
    /// request/response routing.
    pub reply_to: Option<ActorAddress>,

    /// Correlates this envelope with its eventual response, if any.
    pub correlation_id: CorrelationId,

    /// Identifies this specific call attempt.
    pub request_id: RequestId,

    /// Chain this call belongs to; same-chain re-entry is permitted.
    pub chain_id: ChainId,

    /// Frames visited en route to this call.
    pub causality_stack: CausalityStack,

    /// Envelope creation timestamp ( chrono `DateTime<Utc>`).
    pub timestamp: DateTime<Utc>,

    /// Relative time-to-live in seconds; a message older than this when
    /// dequeued is dropped rather than delivered.
    pub ttl: Option<u64>,

    /// Absolute deadline; past this point the caller observes `TimedOut`.
    pub deadline: Option<DateTime<Utc>>,

    /// Message priority (read from the payload at construction time).
    pub priority: MessagePriority,
}

impl<M: Message> MessageEnvelope<M> {
    /// Create a new envelope for the in-process mailbox/broker engine.
    ///
    /// The envelope starts a fresh causality chain and carries no cluster
    /// routing target; use [`Self::for_actor`] when addressing a virtual
    /// actor by `(ActorType, ActorId)`.
    pub fn new(payload: M) -> Self {
        let priority = payload.priority();
        Self {
            payload,
            actor_type: None,
            actor_id: None,
            reply_to: None,
            correlation_id: CorrelationId::new(),
            request_id: RequestId::new(),
            chain_id: ChainId::new_root(),
            causality_stack: Vec::new(),
            timestamp: Utc::now(),
            ttl: None,
            deadline: None,
            priority,
        }
    }

    /// Create a new envelope addressed to a virtual actor by its stable
    /// `(ActorType, ActorId)` key, starting a fresh causality chain.
    pub fn for_actor(payload: M, actor_type: ActorType, actor_id: ActorId) -> Self {
        let mut envelope = Self::new(payload);
        envelope.actor_type = Some(actor_type);
        envelope.actor_id = Some(actor_id);
        envelope
    }

    /// Builder method: continue an existing causality chain instead of
    /// starting a new one (used for nested/reentrant calls).
    pub fn with_chain(mut self, chain_id: ChainId, causality_stack: CausalityStack) -> Self {
        self.chain_id = chain_id;
        self.causality_stack = causality_stack;
        self
    }

    /// Builder method: set an explicit correlation id (used when replaying
    /// a wire `RequestFrame` into a local envelope).
    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = id;
        self
    }

    /// Builder method: set an explicit request id (used when replaying a
    /// retried wire `RequestFrame` attempt into a local envelope).
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    /// Builder method: set an absolute deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder method: set a relative time-to-live, in seconds.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    /// Builder method: set the in-process reply address.
    pub fn with_reply_to(mut self, reply_to: ActorAddress) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Whether `now` is past this envelope's absolute deadline, if any.
    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Utc::now() > deadline)
    }

    /// Whether this envelope's relative ttl, if any, has elapsed since
    /// `timestamp`.
    pub fn is_stale(&self) -> bool {
        match self.ttl {
            Some(ttl) => {
                let elapsed = Utc::now().signed_duration_since(self.timestamp).num_seconds();
                elapsed.max(0) as u64 > ttl
            }
            None => false,
        }
    }

    /// Get the message type from the payload's const.
    pub fn message_type(&self) -> &'static str {
        M::MESSAGE_TYPE
    }
}

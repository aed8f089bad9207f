//! Wire frame types carried by the [`crate::transport::Transport`] contract.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::message::CorrelationId;
use crate::util::{ActorId, ActorType, SiloId};

/// An outbound invocation request, opaque beyond its routing metadata.
#[derive(Debug, Clone)]
pub struct RequestFrame {
    /// Correlates this request with its eventual [`ResponseFrame`].
    pub correlation_id: CorrelationId,
    /// The silo this request targets.
    pub target_silo: SiloId,
    /// The target actor's behavior name.
    pub actor_type: ActorType,
    /// The target actor's stable identity.
    pub actor_id: ActorId,
    /// The method being invoked, opaque to the transport.
    pub method_name: String,
    /// Serialized method arguments.
    pub args: Bytes,
    /// Absolute deadline; the callee should abandon work past this point.
    pub deadline: Option<DateTime<Utc>>,
}

/// The outcome of an invocation, as carried back over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseOutcome {
    /// The call completed; the payload is the opaque result blob.
    Ok(Bytes),
    /// The call failed; the string is a human-readable reason, not a
    /// structured error — the transport layer does not interpret callee
    /// errors, it only ferries them.
    Err(String),
    /// The callee observed its deadline elapse before completing.
    TimedOut,
}

/// The response to a [`RequestFrame`], correlated by [`CorrelationId`].
#[derive(Debug, Clone)]
pub struct ResponseFrame {
    /// Matches the [`RequestFrame::correlation_id`] this responds to.
    pub correlation_id: CorrelationId,
    /// The invocation's outcome.
    pub outcome: ResponseOutcome,
}

/// A best-effort request to abandon an in-flight invocation.
#[derive(Debug, Clone)]
pub struct CancelFrame {
    /// The correlation id of the request to cancel.
    pub correlation_id: CorrelationId,
}

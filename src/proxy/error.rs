//! Proxy error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::transport::TransportError;
use crate::util::ActorKey;

/// Errors raised by [`crate::proxy::ActorProxy::invoke`].
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The target actor has no current placement in the directory.
    #[error("actor not placed: {0}")]
    NotPlaced(ActorKey),

    /// No handler is registered for `(ActorType, method_name)`.
    #[error("no method handler registered for {actor_type}::{method_name}")]
    UnknownMethod {
        /// The actor type the call targeted.
        actor_type: String,
        /// The method name the call targeted.
        method_name: String,
    },

    /// The handler itself returned an application-level error.
    #[error("method call failed: {0}")]
    CallFailed(String),

    /// The call's deadline elapsed before a result was produced.
    #[error("call to {0} timed out")]
    TimedOut(ActorKey),

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The activation's turn-loop mailbox was closed or its reply was
    /// dropped before a result arrived (activation deactivated mid-call).
    #[error("activation unavailable: {0}")]
    ActivationUnavailable(ActorKey),
}

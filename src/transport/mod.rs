//! Inter-silo transport: wire frames, connection pooling, and retries.
//!
//! The transport layer carries opaque `invoke` calls between silos. It
//! knows nothing about actor semantics — it only multiplexes
//! [`RequestFrame`]/[`ResponseFrame`]/[`CancelFrame`] values over
//! per-target connections, keyed by [`crate::message::CorrelationId`].
//! The [`crate::proxy`] module sits above this and is what actually
//! understands actor types, method names, and local short-circuiting.

pub mod error;
pub mod frames;
pub mod local;
pub mod pool;
pub mod retry;

pub use error::TransportError;
pub use frames::{CancelFrame, RequestFrame, ResponseFrame, ResponseOutcome};
pub use local::LocalTransport;
pub use pool::ConnectionPool;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use crate::util::SiloId;

/// Opaque inter-silo request/response/cancel carrier.
///
/// One [`Transport`] implementation exists per deployment topology (an
/// in-process reference one for tests, a real network client in
/// production); [`crate::proxy::ActorProxy`] is the only internal
/// caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `frame` to `target` and wait for its response.
    async fn send_request(
        &self,
        target: &SiloId,
        frame: RequestFrame,
    ) -> Result<ResponseFrame, TransportError>;

    /// Signal that the in-flight call correlated by `frame` should be
    /// abandoned; best-effort, not guaranteed to reach the callee before
    /// it completes.
    async fn send_cancel(&self, target: &SiloId, frame: CancelFrame) -> Result<(), TransportError>;
}

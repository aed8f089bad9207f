//! In-process reference `Transport`: routes frames directly to registered
//! silo handlers without touching a real network.
//!
//! Used in tests and single-process deployments where every "silo" is
//! actually a task within the same runtime. A production deployment
//! would supply a different [`crate::transport::Transport`]
//! implementation backed by a real RPC client.

// Layer 1: Standard library imports
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::warn;

// Layer 3: Internal module imports
use crate::transport::error::TransportError;
use crate::transport::frames::{CancelFrame, RequestFrame, ResponseFrame, ResponseOutcome};
use crate::transport::Transport;
use crate::util::SiloId;

type SiloHandler = Arc<
    dyn Fn(RequestFrame) -> Pin<Box<dyn Future<Output = ResponseFrame> + Send>> + Send + Sync,
>;

/// In-process `Transport` that dispatches directly to a handler
/// registered per silo, rather than serializing frames over a socket.
///
/// A dispatch table mapping silo id to handler is the only form of type
/// erasure this transport needs (`dyn Fn` boxed futures); every actor
/// type's own method dispatch stays in [`crate::proxy`], which this
/// transport knows nothing about.
#[derive(Default)]
pub struct LocalTransport {
    handlers: DashMap<SiloId, SiloHandler>,
}

impl LocalTransport {
    /// Create a transport with no silos registered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the inbound handler for `silo_id`: whenever a
    /// [`RequestFrame`] targets this silo, `handler` is invoked to
    /// produce the [`ResponseFrame`].
    pub fn register_silo<F, Fut>(&self, silo_id: SiloId, handler: F)
    where
        F: Fn(RequestFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseFrame> + Send + 'static,
    {
        self.handlers
            .insert(silo_id, Arc::new(move |frame| Box::pin(handler(frame))));
    }

    /// Deregister a silo's handler (e.g. on graceful shutdown).
    pub fn unregister_silo(&self, silo_id: &SiloId) {
        self.handlers.remove(silo_id);
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send_request(
        &self,
        target: &SiloId,
        frame: RequestFrame,
    ) -> Result<ResponseFrame, TransportError> {
        let handler = self
            .handlers
            .get(target)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TransportError::UnknownSilo(target.clone()))?;

        let correlation_id = frame.correlation_id;
        let deadline = frame.deadline;
        let call = handler(frame);

        match deadline {
            Some(deadline) => {
                #[allow(clippy::unwrap_used)]
                let remaining = (deadline - Utc::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                match tokio::time::timeout(remaining, call).await {
                    Ok(response) => Ok(response),
                    Err(_) => Ok(ResponseFrame {
                        correlation_id,
                        outcome: ResponseOutcome::TimedOut,
                    }),
                }
            }
            None => Ok(call.await),
        }
    }

    async fn send_cancel(&self, target: &SiloId, frame: CancelFrame) -> Result<(), TransportError> {
        if !self.handlers.contains_key(target) {
            return Err(TransportError::UnknownSilo(target.clone()));
        }
        // Best-effort: the in-process reference transport has no
        // in-flight call registry to signal, so cancellation here only
        // logs intent. A real transport would forward this frame to the
        // peer so it can observe cancellation before its next await.
        warn!(correlation_id = %frame.correlation_id, silo = %target, "cancel requested (best-effort, no-op for local transport)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CorrelationId;
    use crate::util::{ActorId, ActorType};
    use bytes::Bytes;

    fn silo(name: &str) -> SiloId {
        #[allow(clippy::unwrap_used)]
        SiloId::new(name).unwrap()
    }

    fn frame(deadline: Option<chrono::DateTime<Utc>>) -> RequestFrame {
        #[allow(clippy::unwrap_used)]
        RequestFrame {
            correlation_id: CorrelationId::new(),
            target_silo: silo("silo-a"),
            actor_type: ActorType::new("counter").unwrap(),
            actor_id: ActorId::new("c1").unwrap(),
            method_name: "increment".to_string(),
            args: Bytes::new(),
            deadline,
        }
    }

    #[tokio::test]
    async fn routes_to_registered_handler() {
        let transport = LocalTransport::new();
        transport.register_silo(silo("silo-a"), |req| async move {
            ResponseFrame {
                correlation_id: req.correlation_id,
                outcome: ResponseOutcome::Ok(Bytes::from_static(b"ok")),
            }
        });

        let response = transport.send_request(&silo("silo-a"), frame(None)).await.unwrap();
        assert!(matches!(response.outcome, ResponseOutcome::Ok(_)));
    }

    #[tokio::test]
    async fn unknown_silo_is_rejected() {
        let transport = LocalTransport::new();
        let err = transport
            .send_request(&silo("silo-z"), frame(None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownSilo(_)));
    }

    #[tokio::test]
    async fn deadline_exceeded_yields_timed_out() {
        let transport = LocalTransport::new();
        transport.register_silo(silo("silo-a"), |req| async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            ResponseFrame {
                correlation_id: req.correlation_id,
                outcome: ResponseOutcome::Ok(Bytes::new()),
            }
        });

        let deadline = Utc::now() + chrono::Duration::milliseconds(10);
        let response = transport
            .send_request(&silo("silo-a"), frame(Some(deadline)))
            .await
            .unwrap();
        assert!(matches!(response.outcome, ResponseOutcome::TimedOut));
    }

    #[tokio::test]
    async fn cancel_on_unknown_silo_errors() {
        let transport = LocalTransport::new();
        let err = transport
            .send_cancel(
                &silo("silo-z"),
                CancelFrame {
                    correlation_id: CorrelationId::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownSilo(_)));
    }
}

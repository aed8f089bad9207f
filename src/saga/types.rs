//! Saga identity, status and step contract.

// Layer 1: Standard library imports
use std::fmt;
use std::future::Future;
use std::pin::Pin;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Uniquely identifies one saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SagaId(Uuid);

impl SagaId {
    /// Generate a fresh saga id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SagaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SagaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a saga run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SagaStatus {
    /// Executing steps forward, in order.
    Running,
    /// A step failed; unwinding completed steps in reverse order.
    Compensating,
    /// Every step executed successfully.
    Completed,
    /// Compensation finished (successfully or not); the saga did not
    /// complete its forward work.
    Failed,
}

/// The persisted record a [`crate::saga::SagaCoordinator`] checkpoints
/// after every step, so a crash mid-saga can resume from where it left
/// off rather than re-running already-completed steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaState {
    /// This run's identity.
    pub saga_id: SagaId,
    /// Name of the saga definition that produced this run, for diagnostics.
    pub saga_name: String,
    /// Names of the steps that have executed (forward) or been
    /// compensated (during unwind), in the order they were processed.
    pub completed_steps: Vec<String>,
    /// Opaque, serialized shared context threaded through every step.
    pub context: Bytes,
    /// Current run status.
    pub status: SagaStatus,
}

/// One step of a saga: a forward action plus its compensating action.
///
/// `Context` is the shared, serializable state threaded through every
/// step of one saga run (order id, reserved amounts, whatever the
/// steps need to hand off to each other and to their own compensation).
///
/// Steps are boxed closures rather than a `dyn SagaStep` trait object —
/// the same boxed-`Fn` shape already used for
/// [`crate::proxy::dispatch::MethodTable`]'s handlers and
/// [`crate::transport::local::LocalTransport`]'s per-silo handlers,
/// rather than a second type-erasure mechanism.
pub struct ClosureStep<Context> {
    name: String,
    #[allow(clippy::type_complexity)]
    execute: Box<
        dyn Fn(Context) -> Pin<Box<dyn Future<Output = Result<Context, String>> + Send>> + Send + Sync,
    >,
    #[allow(clippy::type_complexity)]
    compensate: Box<
        dyn for<'a> Fn(&'a Context) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>
            + Send
            + Sync,
    >,
}

impl<Context: Send + Sync + 'static> ClosureStep<Context> {
    /// Build a step from an `execute` and `compensate` closure pair.
    pub fn new<EFut, CFut>(
        name: impl Into<String>,
        execute: impl Fn(Context) -> EFut + Send + Sync + 'static,
        compensate: impl Fn(&Context) -> CFut + Send + Sync + 'static,
    ) -> Self
    where
        EFut: Future<Output = Result<Context, String>> + Send + 'static,
        CFut: Future<Output = Result<(), String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            execute: Box::new(move |ctx| Box::pin(execute(ctx))),
            compensate: Box::new(move |ctx| Box::pin(compensate(ctx))),
        }
    }
}

impl<Context> ClosureStep<Context> {
    /// This step's stable name, persisted in [`SagaState::completed_steps`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the forward action.
    pub async fn execute(&self, context: Context) -> Result<Context, String> {
        (self.execute)(context).await
    }

    /// Run the compensating action.
    pub async fn compensate(&self, context: &Context) -> Result<(), String> {
        (self.compensate)(context).await
    }
}

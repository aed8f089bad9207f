//! Saga coordinator error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::persistence::StateStoreError;
use crate::saga::types::SagaId;

/// Errors raised by [`crate::saga::SagaCoordinator`] operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A step's `execute` returned an error; the saga transitions to
    /// `Compensating` and unwinds its completed steps in reverse order.
    #[error("saga {saga_id} step '{step_name}' failed: {reason}")]
    StepFailed {
        saga_id: SagaId,
        step_name: String,
        reason: String,
    },

    /// All completed steps were compensated, but the saga itself is
    /// reported as failed since its forward progress could not finish.
    #[error("saga {0} failed and was fully compensated")]
    Compensated(SagaId),

    /// `run`/`resume` was called for a saga that has already reached a
    /// terminal status (`Completed` or `Failed`).
    #[error("saga {0} has already finished")]
    AlreadyFinished(SagaId),

    /// `resume` was called for a saga id with no persisted state.
    #[error("no persisted state for saga {0}")]
    NotFound(SagaId),

    /// The underlying state store rejected a read or write.
    #[error("saga state persistence failed: {0}")]
    Persistence(#[from] StateStoreError),
}

//! Saga coordination: ordered steps with compensation on failure.
//!
//! A saga is a sequence of [`types::ClosureStep`]s sharing a context.
//! [`coordinator::SagaCoordinator`] runs them forward, checkpointing
//! after each one through the same [`crate::persistence::StateStore`]
//! every other durable subsystem uses; if a step fails, already-completed
//! steps are compensated in reverse order. A crash mid-saga is recovered
//! by [`coordinator::SagaCoordinator::resume`], which continues forward
//! execution or compensation from the last checkpoint.

pub mod coordinator;
pub mod error;
pub mod types;

pub use coordinator::SagaCoordinator;
pub use error::SagaError;
pub use types::{ClosureStep, SagaId, SagaState, SagaStatus};

//! Utility types and helpers shared across the runtime.

pub mod ids;
pub mod serde_helpers;

pub use ids::{
    ActorAddress, ActorId, ActorKey, ActorType, EmptyIdentityError, InstanceId, MessageId, SiloId,
};
pub use serde_helpers::duration_serde;

//! Actor system framework with lifecycle management.
//!
//! Provides the main entry point for the actor runtime system.

pub mod actor_system;
pub mod builder;
pub mod config;
pub mod errors;
pub mod runtime;

// Re-exports
pub use actor_system::ActorSystem;
pub use builder::ActorSpawnBuilder;
pub use config::{
    SystemConfig, DEFAULT_ENABLE_METRICS, DEFAULT_MAILBOX_CAPACITY, DEFAULT_MAX_ACTORS,
    DEFAULT_MEMBERSHIP_POLL_INTERVAL, DEFAULT_MEMBERSHIP_TTL, DEFAULT_REMINDER_LEEWAY,
    DEFAULT_REMINDER_POLL_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_SPAWN_TIMEOUT,
};
pub use errors::SystemError;
pub use runtime::{FiredReminder, Providers, QuarkRuntime, StreamDelivery};

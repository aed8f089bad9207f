//! Location-transparent actor invocation.
//!
//! [`ActorProxy`] is what callers actually use: `invoke` looks up the
//! actor's current placement in the [`crate::directory::Directory`] and
//! either calls the method handler directly in-process (when the target
//! silo is this one) or routes the call through
//! [`crate::transport::Transport`] — the caller cannot tell which path
//! was taken.

pub mod activation;
pub mod actor_proxy;
pub mod dispatch;
pub mod error;

pub use activation::{ActivationRegistry, ActivationState, ON_REMINDER, ON_STREAM_MESSAGE};
pub use actor_proxy::ActorProxy;
pub use dispatch::{MethodHandler, MethodTable};
pub use error::ProxyError;

//! Static per-interface method dispatch table.
//!
//! Reflection-based method invocation is replaced with a static dispatch
//! table the host builds once at startup: `(ActorType, method name) ->`
//! boxed async closure. This is the one place in the runtime that
//! reaches for `dyn` rather than generics — the table is inherently
//! type-erased, since it holds handlers for many unrelated actor types
//! side by side, keyed by a runtime string rather than resolved at
//! compile time.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;

// Layer 3: Internal module imports
use crate::proxy::error::ProxyError;
use crate::util::{ActorId, ActorType};

/// A boxed async method handler: takes the callee's identity and the
/// opaque argument blob, returns the opaque result blob.
pub type MethodHandler =
    Arc<dyn Fn(ActorId, Bytes) -> Pin<Box<dyn Future<Output = Result<Bytes, ProxyError>> + Send>> + Send + Sync>;

/// `(ActorType, method name) -> MethodHandler` dispatch table.
#[derive(Default, Clone)]
pub struct MethodTable {
    handlers: HashMap<(ActorType, String), MethodHandler>,
}

impl MethodTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `actor_type::method_name`.
    pub fn register<F, Fut>(&mut self, actor_type: ActorType, method_name: impl Into<String>, handler: F)
    where
        F: Fn(ActorId, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes, ProxyError>> + Send + 'static,
    {
        self.handlers.insert(
            (actor_type, method_name.into()),
            Arc::new(move |id, args| Box::pin(handler(id, args))),
        );
    }

    /// Look up the handler for `actor_type::method_name`, if registered.
    pub fn get(&self, actor_type: &ActorType, method_name: &str) -> Option<MethodHandler> {
        self.handlers
            .get(&(actor_type.clone(), method_name.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_dispatch() {
        let mut table = MethodTable::new();
        #[allow(clippy::unwrap_used)]
        let actor_type = ActorType::new("counter").unwrap();
        table.register(actor_type.clone(), "increment", |_id, _args| async {
            Ok(Bytes::from_static(b"1"))
        });

        #[allow(clippy::unwrap_used)]
        let handler = table.get(&actor_type, "increment").unwrap();
        #[allow(clippy::unwrap_used)]
        let id = ActorId::new("c1").unwrap();
        let result = handler(id, Bytes::new()).await.unwrap();
        assert_eq!(result, Bytes::from_static(b"1"));
    }

    #[test]
    fn unknown_method_returns_none() {
        let table = MethodTable::new();
        #[allow(clippy::unwrap_used)]
        let actor_type = ActorType::new("counter").unwrap();
        assert!(table.get(&actor_type, "missing").is_none());
    }
}

//! `ActorProxy`: location-transparent `invoke`.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::trace;

// Layer 3: Internal module imports
use crate::directory::Directory;
use crate::message::{ChainId, CorrelationId};
use crate::proxy::activation::ActivationRegistry;
use crate::proxy::dispatch::MethodTable;
use crate::proxy::error::ProxyError;
use crate::transport::{RequestFrame, ResponseOutcome, RetryPolicy, Transport};
use crate::util::{ActorId, ActorKey, ActorType, SiloId};

/// Location-transparent method invocation.
///
/// Generic over the directory and transport implementations (:
/// generic constraints over `dyn` at this seam) so callers can swap in
/// test doubles without paying for virtual dispatch on the hot path.
pub struct ActorProxy<D: Directory, T: Transport> {
    self_silo: SiloId,
    directory: Arc<D>,
    transport: Arc<T>,
    dispatch: MethodTable,
    retry: RetryPolicy,
    activations: Arc<ActivationRegistry>,
}

impl<D: Directory, T: Transport> ActorProxy<D, T> {
    /// Build a proxy for a silo identified by `self_silo`.
    ///
    /// Local calls are serialized through a fresh [`ActivationRegistry`]
    /// private to this proxy; use [`Self::with_activations`] to share one
    /// registry across a proxy and a runtime's reminder/stream delivery
    /// paths so they all turn-loop the same activations.
    pub fn new(self_silo: SiloId, directory: Arc<D>, transport: Arc<T>, dispatch: MethodTable) -> Self {
        let activations = Arc::new(ActivationRegistry::new(dispatch.clone()));
        Self {
            self_silo,
            directory,
            transport,
            dispatch,
            retry: RetryPolicy::default(),
            activations,
        }
    }

    /// Override the default retry policy used for remote calls.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share `activations` with this proxy instead of the private registry
    /// `new` constructs, so local dispatch and (e.g.) a runtime's reminder
    /// poller serialize against the same per-actor turn loop.
    pub fn with_activations(mut self, activations: Arc<ActivationRegistry>) -> Self {
        self.activations = activations;
        self
    }

    /// This proxy's activation registry, for callers (reminder pollers,
    /// implicit stream delivery) that need to dispatch into the same
    /// turn loops outside of a regular `invoke` call.
    pub fn activations(&self) -> &Arc<ActivationRegistry> {
        &self.activations
    }

    /// Invoke `method_name` on the actor identified by `(actor_type, actor_id)`,
    /// starting a fresh [`ChainId`] for the call.
    ///
    /// Resolves the actor's current placement from the directory; if it
    /// is hosted on `self_silo`, the call short-circuits directly into
    /// the local turn loop without touching the transport at all.
    /// Otherwise it is sent as a [`RequestFrame`] and retried per the
    /// configured [`RetryPolicy`] for transient transport failures.
    pub async fn invoke(
        &self,
        actor_type: ActorType,
        actor_id: ActorId,
        method_name: &str,
        args: Bytes,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Bytes, ProxyError> {
        self.invoke_chained(actor_type, actor_id, method_name, args, deadline, ChainId::new_root())
            .await
    }

    /// Like [`Self::invoke`], but continuing an existing [`ChainId`]
    /// rather than starting a fresh one.
    ///
    /// A handler that calls back out through its own proxy while already
    /// mid-turn must pass its own context's chain id here: a nested local
    /// call sharing that chain bypasses the mailbox instead of deadlocking
    /// behind the very turn that issued it.
    #[allow(clippy::too_many_arguments)]
    pub async fn invoke_chained(
        &self,
        actor_type: ActorType,
        actor_id: ActorId,
        method_name: &str,
        args: Bytes,
        deadline: Option<DateTime<Utc>>,
        chain_id: ChainId,
    ) -> Result<Bytes, ProxyError> {
        let key = ActorKey::new(actor_type.clone(), actor_id.clone());
        let entry = self
            .directory
            .get(&key)
            .await
            .ok_or_else(|| ProxyError::NotPlaced(key.clone()))?;

        if entry.silo_id == self.self_silo {
            trace!(actor = %key, method = method_name, "local short-circuit");
            return self.activations.dispatch(key, method_name, args, chain_id).await;
        }

        self.invoke_remote(entry.silo_id, actor_type, actor_id, method_name, args, deadline, &key)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn invoke_remote(
        &self,
        target_silo: SiloId,
        actor_type: ActorType,
        actor_id: ActorId,
        method_name: &str,
        args: Bytes,
        deadline: Option<DateTime<Utc>>,
        key: &ActorKey,
    ) -> Result<Bytes, ProxyError> {
        let response = self
            .retry
            .execute(|| {
                let frame = RequestFrame {
                    correlation_id: CorrelationId::new(),
                    target_silo: target_silo.clone(),
                    actor_type: actor_type.clone(),
                    actor_id: actor_id.clone(),
                    method_name: method_name.to_string(),
                    args: args.clone(),
                    deadline,
                };
                let transport = &self.transport;
                let target = &target_silo;
                async move { transport.send_request(target, frame).await }
            })
            .await?;

        match response.outcome {
            ResponseOutcome::Ok(bytes) => Ok(bytes),
            ResponseOutcome::Err(reason) => Err(ProxyError::CallFailed(reason)),
            ResponseOutcome::TimedOut => Err(ProxyError::TimedOut(key.clone())),
        }
    }
}

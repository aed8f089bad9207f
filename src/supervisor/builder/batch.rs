//! Batch child builder for spawning multiple children with shared configuration.
//!
//! This module provides the [`ChildrenBatchBuilder`] type for efficiently spawning
//! multiple child processes with shared default configuration while allowing
//! per-child customization.

use std::collections::HashMap;
use std::time::Duration;

use crate::monitoring::traits::Monitor;
use crate::monitoring::types::SupervisionEvent;
use crate::supervisor::builder::constants::{
    DEFAULT_RESTART_POLICY, DEFAULT_SHUTDOWN_POLICY, DEFAULT_SHUTDOWN_TIMEOUT,
    DEFAULT_START_TIMEOUT,
};
use crate::supervisor::builder::customizer::BatchChildCustomizer;
use crate::supervisor::node::SupervisorNode;
use crate::supervisor::traits::{Child, SupervisionStrategy, Supervisor};
use crate::supervisor::types::{ChildId, RestartPolicy, ShutdownPolicy};
use crate::supervisor::ChildSpec;
use crate::supervisor::SupervisorError;

/// Internal struct representing a child spec with possible overrides
pub(super) struct BatchChildSpec<C> {
    pub(super) id: String,
    pub(super) factory: Box<dyn Fn() -> C + Send + Sync + 'static>,
    pub(super) restart_policy: Option<RestartPolicy>,
    pub(super) shutdown_policy: Option<ShutdownPolicy>,
    pub(super) start_timeout: Option<Duration>,
    pub(super) shutdown_timeout: Option<Duration>,
}

impl<C> BatchChildSpec<C> {
    fn new(id: String, factory: Box<dyn Fn() -> C + Send + Sync + 'static>) -> Self {
        Self {
            id,
            factory,
            restart_policy: None,
            shutdown_policy: None,
            start_timeout: None,
            shutdown_timeout: None,
        }
    }
}

/// Builder for batching multiple children with shared defaults
pub struct ChildrenBatchBuilder<'a, S, C, M>
where
    S: SupervisionStrategy,
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    supervisor: &'a mut SupervisorNode<S, C, M>,
    shared_restart_policy: RestartPolicy,
    shared_shutdown_policy: ShutdownPolicy,
    shared_start_timeout: Duration,
    shared_shutdown_timeout: Duration,
    pub(super) children: Vec<BatchChildSpec<C>>,
}

impl<'a, S, C, M> ChildrenBatchBuilder<'a, S, C, M>
where
    S: SupervisionStrategy + Send + Sync,
    C: Child + Send + Sync,
    M: Monitor<SupervisionEvent> + Send + Sync + 'static,
{
    pub fn new(supervisor: &'a mut SupervisorNode<S, C, M>) -> Self {
        Self {
            supervisor,
            shared_restart_policy: DEFAULT_RESTART_POLICY,
            shared_shutdown_policy: DEFAULT_SHUTDOWN_POLICY,
            shared_start_timeout: DEFAULT_START_TIMEOUT,
            shared_shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            children: Vec::new(),
        }
    }

    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.shared_restart_policy = policy;
        self
    }
    pub fn shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shared_shutdown_policy = policy;
        self
    }
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.shared_start_timeout = timeout;
        self
    }
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shared_shutdown_timeout = timeout;
        self
    }
    /// Add a child with shared defaults
    pub fn child<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        let spec = BatchChildSpec::new(id.into(), Box::new(factory));
        self.children.push(spec);
        self
    }
    /// Add a child with per-child customization
    pub fn child_with<F>(
        mut self,
        id: impl Into<String>,
        factory: F,
    ) -> BatchChildCustomizer<'a, S, C, M>
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        let spec = BatchChildSpec::new(id.into(), Box::new(factory));
        self.children.push(spec);
        let child_index = self.children.len() - 1;
        BatchChildCustomizer::new(self, child_index)
    }
    /// Spawn all children, fail-fast on error
    pub async fn spawn_all(self) -> Result<Vec<ChildId>, SupervisorError> {
        let mut ids = Vec::new();
        for child in self.children {
            let spec = ChildSpec {
                id: child.id,
                factory: child.factory,
                restart_policy: child.restart_policy.unwrap_or(self.shared_restart_policy),
                shutdown_policy: child.shutdown_policy.unwrap_or(self.shared_shutdown_policy),
                start_timeout: child.start_timeout.unwrap_or(self.shared_start_timeout),
                shutdown_timeout: child
                    .shutdown_timeout
                    .unwrap_or(self.shared_shutdown_timeout),
            };
            let id = self.supervisor.start_child(spec).await?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Spawn all children, return HashMap of id to ChildId
    pub async fn spawn_all_map(self) -> Result<HashMap<String, ChildId>, SupervisorError> {
        let mut map = HashMap::new();
        for child in self.children {
            let id = child.id.clone();
            let spec = ChildSpec {
                id: child.id,
                factory: child.factory,
                restart_policy: child.restart_policy.unwrap_or(self.shared_restart_policy),
                shutdown_policy: child.shutdown_policy.unwrap_or(self.shared_shutdown_policy),
                start_timeout: child.start_timeout.unwrap_or(self.shared_start_timeout),
                shutdown_timeout: child
                    .shutdown_timeout
                    .unwrap_or(self.shared_shutdown_timeout),
            };
            let child_id = self.supervisor.start_child(spec).await?;
            map.insert(id, child_id);
        }
        Ok(map)
    }
}

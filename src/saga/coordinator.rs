//! `SagaCoordinator`: ordered step execution with compensation on failure.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

// Layer 3: Internal module imports
use crate::persistence::{StateKey, StateStore, StateVersion};
use crate::saga::error::SagaError;
use crate::saga::types::{ClosureStep, SagaId, SagaState, SagaStatus};
use crate::util::{ActorId, ActorKey, ActorType};

/// The state store key under which one saga's checkpoint is persisted.
///
/// Sagas piggyback on the same optimistic-concurrency `StateStore` every
/// other durable subsystem uses, keyed by a dedicated `saga` actor type
/// and a `"checkpoint"` slot so saga checkpoints never collide with an
/// actor's own state record.
fn saga_key(saga_id: SagaId) -> StateKey {
    #[allow(clippy::unwrap_used)]
    let actor_type = ActorType::new("saga").unwrap();
    #[allow(clippy::unwrap_used)]
    let actor_id = ActorId::new(saga_id.to_string()).unwrap();
    StateKey::new(ActorKey::new(actor_type, actor_id), "checkpoint")
}

/// Coordinates one saga definition: an ordered list of steps sharing a
/// `Context`, persisted after every step so a crash can resume instead
/// of re-running or silently abandoning a partially-completed saga.
pub struct SagaCoordinator<Context, S: StateStore> {
    name: String,
    steps: Vec<ClosureStep<Context>>,
    state_store: Arc<S>,
}

impl<Context, S> SagaCoordinator<Context, S>
where
    Context: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    S: StateStore,
{
    /// Define a saga with a name (used in diagnostics and persisted
    /// checkpoints) and its ordered steps.
    pub fn new(name: impl Into<String>, steps: Vec<ClosureStep<Context>>, state_store: Arc<S>) -> Self {
        Self {
            name: name.into(),
            steps,
            state_store,
        }
    }

    /// Start a fresh saga run with the given initial context, executing
    /// steps in order and persisting a checkpoint after each one.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Compensated`] if a step failed and the saga
    /// was rolled back; compensation failures are logged but do not
    /// change the returned error, since the saga is already failed.
    pub async fn run(&self, saga_id: SagaId, context: Context) -> Result<Context, SagaError> {
        let mut state = SagaState {
            saga_id,
            saga_name: self.name.clone(),
            completed_steps: Vec::new(),
            context: encode(&context)?,
            status: SagaStatus::Running,
        };
        self.persist(&state, None).await?;
        self.drive(state, context).await
    }

    /// Resume a previously persisted saga run, continuing forward
    /// execution (if it was `Running`) or compensation (if it was
    /// `Compensating`) from its last checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::NotFound`] if no checkpoint exists for
    /// `saga_id`, or [`SagaError::AlreadyFinished`] if it already
    /// reached a terminal status.
    pub async fn resume(&self, saga_id: SagaId) -> Result<Context, SagaError> {
        let key = saga_key(saga_id);
        let record = self
            .state_store
            .load(&key)
            .await?
            .ok_or(SagaError::NotFound(saga_id))?;
        #[allow(clippy::unwrap_used)]
        let state: SagaState = serde_json::from_slice(&record.data).unwrap();
        let context: Context = decode(&state.context)?;

        match state.status {
            SagaStatus::Completed | SagaStatus::Failed => Err(SagaError::AlreadyFinished(saga_id)),
            SagaStatus::Running => self.drive(state, context).await,
            SagaStatus::Compensating => {
                let reason = "resumed after crash during compensation".to_string();
                self.compensate(state, context, reason).await
            }
        }
    }

    /// Run the forward step loop starting from `state`'s checkpoint.
    async fn drive(&self, mut state: SagaState, mut context: Context) -> Result<Context, SagaError> {
        let start_index = state.completed_steps.len();
        for step in self.steps.iter().skip(start_index) {
            match step.execute(context.clone()).await {
                Ok(next_context) => {
                    context = next_context;
                    state.completed_steps.push(step.name().to_string());
                    state.context = encode(&context)?;
                    self.checkpoint(&mut state).await?;
                    info!(saga_id = %state.saga_id, step = step.name(), "saga step completed");
                }
                Err(reason) => {
                    warn!(saga_id = %state.saga_id, step = step.name(), %reason, "saga step failed, compensating");
                    state.status = SagaStatus::Compensating;
                    self.checkpoint(&mut state).await?;
                    return self.compensate(state, context, reason).await;
                }
            }
        }
        state.status = SagaStatus::Completed;
        self.checkpoint(&mut state).await?;
        Ok(context)
    }

    /// Undo every completed step in reverse order. Best-effort: a step
    /// whose `compensate` fails is logged and skipped so the rest of
    /// the rollback still runs.
    async fn compensate(
        &self,
        mut state: SagaState,
        context: Context,
        reason: String,
    ) -> Result<Context, SagaError> {
        for step_name in state.completed_steps.clone().iter().rev() {
            if let Some(step) = self.steps.iter().find(|s| s.name() == step_name) {
                if let Err(compensate_err) = step.compensate(&context).await {
                    warn!(
                        saga_id = %state.saga_id,
                        step = step_name,
                        error = %compensate_err,
                        "compensation failed, continuing rollback"
                    );
                }
            }
        }
        state.status = SagaStatus::Failed;
        self.checkpoint(&mut state).await?;

        let saga_id = state.saga_id;
        let saga_name = state.saga_name.clone();
        let _ = context;
        warn!(%saga_id, saga_name = %saga_name, %reason, "saga failed");
        Err(SagaError::Compensated(saga_id))
    }

    async fn checkpoint(&self, state: &mut SagaState) -> Result<(), SagaError> {
        let key = saga_key(state.saga_id);
        let current_version = self.state_store.load(&key).await?.map(|record| record.version);
        self.persist(state, current_version).await
    }

    async fn persist(&self, state: &SagaState, expected_version: Option<StateVersion>) -> Result<(), SagaError> {
        let key = saga_key(state.saga_id);
        #[allow(clippy::unwrap_used)]
        let payload = Bytes::from(serde_json::to_vec(state).unwrap());
        self.state_store.save(&key, payload, expected_version).await?;
        Ok(())
    }
}

fn encode<Context: Serialize>(context: &Context) -> Result<Bytes, SagaError> {
    #[allow(clippy::unwrap_used)]
    Ok(Bytes::from(serde_json::to_vec(context).unwrap()))
}

fn decode<Context: DeserializeOwned>(bytes: &Bytes) -> Result<Context, SagaError> {
    #[allow(clippy::unwrap_used)]
    Ok(serde_json::from_slice(bytes).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryStateStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
    struct OrderContext {
        order_id: String,
        reserved: bool,
        charged: bool,
        shipped: bool,
    }

    fn reserve_step() -> ClosureStep<OrderContext> {
        ClosureStep::new(
            "reserve_inventory",
            |mut ctx: OrderContext| async move {
                ctx.reserved = true;
                Ok(ctx)
            },
            |_ctx: &OrderContext| async move { Ok(()) },
        )
    }

    fn charge_step(fail: bool) -> ClosureStep<OrderContext> {
        ClosureStep::new(
            "charge_payment",
            move |mut ctx: OrderContext| async move {
                if fail {
                    Err("card declined".to_string())
                } else {
                    ctx.charged = true;
                    Ok(ctx)
                }
            },
            |_ctx: &OrderContext| async move { Ok(()) },
        )
    }

    fn ship_step() -> ClosureStep<OrderContext> {
        ClosureStep::new(
            "ship_order",
            |mut ctx: OrderContext| async move {
                ctx.shipped = true;
                Ok(ctx)
            },
            |_ctx: &OrderContext| async move { Ok(()) },
        )
    }

    #[tokio::test]
    async fn successful_saga_runs_every_step() {
        let store = Arc::new(InMemoryStateStore::new());
        let coordinator = SagaCoordinator::new(
            "place_order",
            vec![reserve_step(), charge_step(false), ship_step()],
            store,
        );
        let context = OrderContext {
            order_id: "o1".to_string(),
            reserved: false,
            charged: false,
            shipped: false,
        };
        let result = coordinator.run(SagaId::new(), context).await.unwrap();
        assert!(result.reserved && result.charged && result.shipped);
    }

    #[tokio::test]
    async fn failed_step_triggers_reverse_compensation() {
        let compensated_order = Arc::new(AtomicUsize::new(0));
        let order_counter = Arc::clone(&compensated_order);
        let reserve = ClosureStep::new(
            "reserve_inventory",
            |mut ctx: OrderContext| async move {
                ctx.reserved = true;
                Ok(ctx)
            },
            move |_ctx: &OrderContext| {
                let order_counter = Arc::clone(&order_counter);
                async move {
                    order_counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        );

        let store = Arc::new(InMemoryStateStore::new());
        let coordinator =
            SagaCoordinator::new("place_order", vec![reserve, charge_step(true), ship_step()], store);
        let context = OrderContext {
            order_id: "o2".to_string(),
            reserved: false,
            charged: false,
            shipped: false,
        };
        let err = coordinator.run(SagaId::new(), context).await.unwrap_err();
        assert!(matches!(err, SagaError::Compensated(_)));
        assert_eq!(compensated_order.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resume_continues_from_last_checkpoint() {
        let store = Arc::new(InMemoryStateStore::new());
        let saga_id = SagaId::new();
        let context = OrderContext {
            order_id: "o3".to_string(),
            reserved: false,
            charged: false,
            shipped: false,
        };

        let key = saga_key(saga_id);
        let state = SagaState {
            saga_id,
            saga_name: "place_order".to_string(),
            completed_steps: vec!["reserve_inventory".to_string()],
            context: encode(&OrderContext {
                reserved: true,
                ..context.clone()
            })
            .unwrap(),
            status: SagaStatus::Running,
        };
        let payload = Bytes::from(serde_json::to_vec(&state).unwrap());
        store.save(&key, payload, None).await.unwrap();

        let coordinator = SagaCoordinator::new(
            "place_order",
            vec![reserve_step(), charge_step(false), ship_step()],
            store,
        );
        let result = coordinator.resume(saga_id).await.unwrap();
        assert!(result.reserved && result.charged && result.shipped);
    }

    #[tokio::test]
    async fn resume_unknown_saga_errors() {
        let store = Arc::new(InMemoryStateStore::new());
        let coordinator: SagaCoordinator<OrderContext, _> =
            SagaCoordinator::new("place_order", vec![reserve_step()], store);
        let err = coordinator.resume(SagaId::new()).await.unwrap_err();
        assert!(matches!(err, SagaError::NotFound(_)));
    }
}

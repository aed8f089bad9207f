//! Supervisor hierarchy integration tests.
//!
//! Exercises `SupervisorNode`/`SupervisorTree` against realistic children:
//! restart-on-failure under each strategy, restart-limit escalation, and
//! parent/child error escalation across tree levels.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use quark::monitoring::{InMemoryMonitor, MonitoringConfig, SupervisionEvent};
use quark::supervisor::{
    ChildId, ChildSpec, OneForAll, OneForOne, RestForOne, RestartPolicy, ShutdownPolicy,
    Supervisor, SupervisorNode, SupervisorTree,
};

/// A supervised worker that records every `start()` call so tests can
/// observe whether a restart actually discarded in-memory state.
#[derive(Clone)]
struct CountingWorker {
    starts: Arc<Mutex<u32>>,
    stops: Arc<Mutex<u32>>,
}

impl CountingWorker {
    fn new() -> Self {
        Self {
            starts: Arc::new(Mutex::new(0)),
            stops: Arc::new(Mutex::new(0)),
        }
    }
}

#[derive(Debug)]
struct WorkerError(String);

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker error: {}", self.0)
    }
}

impl std::error::Error for WorkerError {}

#[async_trait]
impl quark::supervisor::Child for CountingWorker {
    type Error = WorkerError;

    async fn start(&mut self) -> Result<(), Self::Error> {
        *self.starts.lock() += 1;
        Ok(())
    }

    async fn stop(&mut self, _timeout: Duration) -> Result<(), Self::Error> {
        *self.stops.lock() += 1;
        Ok(())
    }
}

fn monitor() -> InMemoryMonitor<SupervisionEvent> {
    InMemoryMonitor::new(MonitoringConfig::default())
}

fn spec(
    id: &str,
    starts: Arc<Mutex<u32>>,
    stops: Arc<Mutex<u32>>,
) -> ChildSpec<CountingWorker, impl Fn() -> CountingWorker> {
    ChildSpec {
        id: id.to_string(),
        factory: move || CountingWorker {
            starts: starts.clone(),
            stops: stops.clone(),
        },
        restart_policy: RestartPolicy::Permanent,
        shutdown_policy: ShutdownPolicy::Graceful(Duration::from_secs(1)),
        start_timeout: Duration::from_secs(1),
        shutdown_timeout: Duration::from_secs(1),
    }
}

// ============================================================================
// Single-child restart (OneForOne)
// ============================================================================

#[tokio::test]
async fn one_for_one_restarts_only_the_failed_child() {
    let mut supervisor = SupervisorNode::<OneForOne, CountingWorker, _>::new(OneForOne, monitor());

    let starts_a = Arc::new(Mutex::new(0));
    let stops_a = Arc::new(Mutex::new(0));
    let starts_b = Arc::new(Mutex::new(0));
    let stops_b = Arc::new(Mutex::new(0));

    let a = supervisor
        .start_child(spec("a", starts_a.clone(), stops_a.clone()))
        .await
        .unwrap();
    let _b = supervisor
        .start_child(spec("b", starts_b.clone(), stops_b.clone()))
        .await
        .unwrap();

    assert_eq!(*starts_a.lock(), 1);
    assert_eq!(*starts_b.lock(), 1);

    supervisor.restart_child(&a).await.unwrap();

    // `a` was stopped then started again; `b` was never touched.
    assert_eq!(*stops_a.lock(), 1);
    assert_eq!(*starts_a.lock(), 2);
    assert_eq!(*starts_b.lock(), 1);
    assert_eq!(*stops_b.lock(), 0);

    let handle = supervisor.get_child(&a).unwrap();
    assert_eq!(handle.restart_count(), 1);
}

#[tokio::test]
async fn handle_child_error_decides_restart_for_permanent_policy() {
    let mut supervisor = SupervisorNode::<OneForOne, CountingWorker, _>::new(OneForOne, monitor());
    let starts = Arc::new(Mutex::new(0));
    let stops = Arc::new(Mutex::new(0));
    let id = supervisor
        .start_child(spec("w", starts, stops))
        .await
        .unwrap();

    let decision = supervisor
        .handle_child_error(&id, Box::new(WorkerError("boom".into())))
        .await;

    assert_eq!(
        decision,
        quark::supervisor::SupervisionDecision::RestartChild(id)
    );
}

#[tokio::test]
async fn temporary_children_are_stopped_not_restarted() {
    let mut supervisor = SupervisorNode::<OneForOne, CountingWorker, _>::new(OneForOne, monitor());
    let starts = Arc::new(Mutex::new(0));
    let stops = Arc::new(Mutex::new(0));

    let id = supervisor
        .start_child(ChildSpec {
            id: "temp".to_string(),
            factory: {
                let starts = starts.clone();
                let stops = stops.clone();
                move || CountingWorker {
                    starts: starts.clone(),
                    stops: stops.clone(),
                }
            },
            restart_policy: RestartPolicy::Temporary,
            shutdown_policy: ShutdownPolicy::Immediate,
            start_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(1),
        })
        .await
        .unwrap();

    let decision = supervisor
        .handle_child_error(&id, Box::new(WorkerError("boom".into())))
        .await;

    assert_eq!(
        decision,
        quark::supervisor::SupervisionDecision::StopChild(id)
    );
}

// ============================================================================
// Restart-storm guard
// ============================================================================

#[tokio::test]
async fn restart_limit_exceeded_after_repeated_failures() {
    let mut supervisor = SupervisorNode::<OneForOne, CountingWorker, _>::new(OneForOne, monitor());
    let starts = Arc::new(Mutex::new(0));
    let stops = Arc::new(Mutex::new(0));
    let id = supervisor
        .start_child(spec("flaky", starts, stops))
        .await
        .unwrap();

    for _ in 0..5 {
        supervisor.restart_child(&id).await.unwrap();
    }

    let result = supervisor.restart_child(&id).await;
    assert!(matches!(
        result,
        Err(quark::supervisor::SupervisorError::RestartLimitExceeded { .. })
    ));
}

// ============================================================================
// Whole-group restart (OneForAll) / dependency-ordered restart (RestForOne)
// ============================================================================

#[tokio::test]
async fn one_for_all_decision_covers_every_sibling() {
    let mut supervisor = SupervisorNode::<OneForAll, CountingWorker, _>::new(OneForAll, monitor());
    let a = supervisor
        .start_child(spec("a", Arc::new(Mutex::new(0)), Arc::new(Mutex::new(0))))
        .await
        .unwrap();
    let b = supervisor
        .start_child(spec("b", Arc::new(Mutex::new(0)), Arc::new(Mutex::new(0))))
        .await
        .unwrap();
    let c = supervisor
        .start_child(spec("c", Arc::new(Mutex::new(0)), Arc::new(Mutex::new(0))))
        .await
        .unwrap();

    let decision = supervisor
        .handle_child_error(&b, Box::new(WorkerError("boom".into())))
        .await;

    match decision {
        quark::supervisor::SupervisionDecision::RestartAll(ids) => {
            assert_eq!(ids.len(), 3);
            assert!(ids.contains(&a));
            assert!(ids.contains(&b));
            assert!(ids.contains(&c));
        }
        other => panic!("expected RestartAll, got {other:?}"),
    }
}

#[tokio::test]
async fn rest_for_one_decision_covers_failed_and_later_siblings_only() {
    let mut supervisor =
        SupervisorNode::<RestForOne, CountingWorker, _>::new(RestForOne, monitor());
    let a = supervisor
        .start_child(spec("a", Arc::new(Mutex::new(0)), Arc::new(Mutex::new(0))))
        .await
        .unwrap();
    let b = supervisor
        .start_child(spec("b", Arc::new(Mutex::new(0)), Arc::new(Mutex::new(0))))
        .await
        .unwrap();
    let c = supervisor
        .start_child(spec("c", Arc::new(Mutex::new(0)), Arc::new(Mutex::new(0))))
        .await
        .unwrap();

    // `b` fails: `a` (started earlier) must be unaffected; `b` and `c`
    // (started after it) are restarted.
    let decision = supervisor
        .handle_child_error(&b, Box::new(WorkerError("boom".into())))
        .await;

    match decision {
        quark::supervisor::SupervisionDecision::RestartSubset(ids) => {
            assert!(!ids.contains(&a));
            assert!(ids.contains(&b));
            assert!(ids.contains(&c));
        }
        other => panic!("expected RestartSubset, got {other:?}"),
    }
}

// ============================================================================
// Supervisor tree: hierarchy and escalation
// ============================================================================

#[tokio::test]
async fn tree_tracks_parent_child_relationship() {
    let mut tree = SupervisorTree::<OneForOne, CountingWorker, _>::new();
    let root = tree.create_supervisor(None, OneForOne, monitor()).unwrap();
    let child = tree
        .create_supervisor(Some(root), OneForOne, monitor())
        .unwrap();

    assert_eq!(tree.get_parent(child), Some(root));
    assert_eq!(tree.get_parent(root), None);
    assert_eq!(tree.supervisor_count(), 2);
    assert_eq!(tree.root_count(), 1);
}

#[tokio::test]
async fn creating_child_under_unknown_parent_fails() {
    let mut tree = SupervisorTree::<OneForOne, CountingWorker, _>::new();
    let bogus_parent = quark::supervisor::SupervisorId::new();

    let result = tree.create_supervisor(Some(bogus_parent), OneForOne, monitor());
    assert!(matches!(
        result,
        Err(quark::supervisor::SupervisorError::TreeIntegrityViolation { .. })
    ));
}

#[tokio::test]
async fn escalation_from_root_surfaces_as_unrecoverable() {
    let mut tree = SupervisorTree::<OneForOne, CountingWorker, _>::new();
    let root = tree.create_supervisor(None, OneForOne, monitor()).unwrap();

    let error = quark::supervisor::SupervisorError::ChildNotFound {
        id: ChildId::new(),
    };
    let result = tree.escalate_error(root, error).await;
    assert!(matches!(
        result,
        Err(quark::supervisor::SupervisorError::TreeIntegrityViolation { .. })
    ));
}

#[tokio::test]
async fn escalation_from_child_is_absorbed_by_parent() {
    let mut tree = SupervisorTree::<OneForOne, CountingWorker, _>::new();
    let root = tree.create_supervisor(None, OneForOne, monitor()).unwrap();
    let child = tree
        .create_supervisor(Some(root), OneForOne, monitor())
        .unwrap();

    let error = quark::supervisor::SupervisorError::ChildNotFound {
        id: ChildId::new(),
    };
    let result = tree.escalate_error(child, error).await;
    assert!(result.is_ok());
}

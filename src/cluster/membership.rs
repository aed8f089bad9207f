//! `MembershipStore` contract and the in-memory reference implementation.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use crate::cluster::error::MembershipError;
use crate::util::SiloId;

/// A change in cluster topology observed by the membership watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// A silo sent its first heartbeat (or rejoined after expiring).
    SiloJoined(SiloId),
    /// A silo's heartbeat TTL expired without a renewal.
    SiloLeft(SiloId),
}

/// Heartbeat-based cluster membership contract.
///
/// Implementations track which silos are currently alive based on
/// periodic heartbeats and expose a broadcast stream of join/leave
/// events so other subsystems (the placement ring, the directory) can
/// react without polling.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Record a heartbeat from `silo_id`, marking it alive.
    async fn heartbeat(&self, silo_id: SiloId) -> Result<(), MembershipError>;

    /// Currently alive silos, in lexicographic order.
    async fn alive_silos(&self) -> Vec<SiloId>;

    /// Whether `silo_id` is currently considered alive.
    async fn is_alive(&self, silo_id: &SiloId) -> bool;

    /// Subscribe to membership change events.
    fn subscribe(&self) -> broadcast::Receiver<MembershipEvent>;
}

/// DashMap-backed reference `MembershipStore`.
///
/// Alive silos are tracked by their last heartbeat timestamp. A silo
/// is considered expired once `now - last_heartbeat > ttl`; expiry is
/// only detected by the watcher task spawned via
/// [`InMemoryMembershipStore::spawn_watcher`], not by `is_alive` (which
/// reflects recorded state rather than wall-clock extrapolation, so
/// that a single store instance gives a consistent answer between
/// watcher ticks).
pub struct InMemoryMembershipStore {
    last_heartbeat: DashMap<SiloId, DateTime<Utc>>,
    ttl: Duration,
    events: broadcast::Sender<MembershipEvent>,
}

impl InMemoryMembershipStore {
    /// Create a store with the given heartbeat TTL.
    pub fn new(ttl: Duration) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(256);
        Arc::new(Self {
            last_heartbeat: DashMap::new(),
            ttl,
            events: tx,
        })
    }

    /// Spawn the background watcher that polls every `poll_interval` and
    /// emits [`MembershipEvent::SiloLeft`] for any silo whose heartbeat
    /// has gone stale beyond the configured TTL.
    pub fn spawn_watcher(self: &Arc<Self>, poll_interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                store.sweep_expired();
            }
        })
    }

    fn sweep_expired(&self) {
        let now = Utc::now();
        let mut expired = Vec::new();
        for entry in self.last_heartbeat.iter() {
            #[allow(clippy::unwrap_used)]
            let age = (now - *entry.value())
                .to_std()
                .unwrap_or(Duration::from_secs(0));
            if age > self.ttl {
                expired.push(entry.key().clone());
            }
        }
        for silo_id in expired {
            self.last_heartbeat.remove(&silo_id);
            warn!(silo = %silo_id, "silo heartbeat expired, marking as left");
            let _ = self.events.send(MembershipEvent::SiloLeft(silo_id));
        }
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn heartbeat(&self, silo_id: SiloId) -> Result<(), MembershipError> {
        let is_new = !self.last_heartbeat.contains_key(&silo_id);
        self.last_heartbeat.insert(silo_id.clone(), Utc::now());
        if is_new {
            info!(silo = %silo_id, "silo joined the cluster");
            let _ = self.events.send(MembershipEvent::SiloJoined(silo_id));
        } else {
            debug!(silo = %silo_id, "heartbeat renewed");
        }
        Ok(())
    }

    async fn alive_silos(&self) -> Vec<SiloId> {
        let mut silos: Vec<SiloId> = self
            .last_heartbeat
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        silos.sort();
        silos
    }

    async fn is_alive(&self, silo_id: &SiloId) -> bool {
        self.last_heartbeat.contains_key(silo_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<MembershipEvent> {
        self.events.subscribe()
    }
}

//! Per-target connection pool with lazy creation and idle reaping.

// Layer 1: Standard library imports
use std::future::Future;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::transport::error::TransportError;
use crate::util::SiloId;

struct Idle<C> {
    conn: C,
    idle_since: DateTime<Utc>,
}

/// A pool of reusable connections, one sub-pool per target silo.
///
/// Connections are created lazily on first use via the factory passed to
/// [`ConnectionPool::acquire`] and returned to the pool by the caller via
/// [`ConnectionPool::release`]. [`ConnectionPool::reap_idle`] drops any
/// connection that has sat unused longer than the configured idle
/// timeout; callers are expected to invoke it periodically (e.g. from the
/// same background task that drives the membership watcher).
pub struct ConnectionPool<C> {
    by_target: DashMap<SiloId, Mutex<Vec<Idle<C>>>>,
    idle_timeout: chrono::Duration,
}

impl<C> ConnectionPool<C> {
    /// Create a pool whose idle connections are reaped after `idle_timeout`.
    pub fn new(idle_timeout: std::time::Duration) -> Self {
        Self {
            by_target: DashMap::new(),
            #[allow(clippy::unwrap_used)]
            idle_timeout: chrono::Duration::from_std(idle_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
        }
    }

    /// Acquire a connection to `target`, reusing an idle one if available
    /// or calling `factory` to create a fresh one.
    pub async fn acquire<F, Fut>(&self, target: &SiloId, factory: F) -> Result<C, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, TransportError>>,
    {
        if let Some(slot) = self.by_target.get(target) {
            let mut idle = slot.lock();
            if let Some(found) = idle.pop() {
                return Ok(found.conn);
            }
        }
        factory().await
    }

    /// Return `conn` to the pool for `target`, marking it idle now.
    pub fn release(&self, target: &SiloId, conn: C) {
        let slot = self
            .by_target
            .entry(target.clone())
            .or_insert_with(|| Mutex::new(Vec::new()));
        slot.lock().push(Idle {
            conn,
            idle_since: Utc::now(),
        });
    }

    /// Drop every connection that has been idle longer than the
    /// configured timeout.
    pub fn reap_idle(&self) {
        let now = Utc::now();
        for entry in self.by_target.iter() {
            let mut idle = entry.value().lock();
            idle.retain(|c| now.signed_duration_since(c.idle_since) < self.idle_timeout);
        }
    }

    /// Number of idle connections currently pooled for `target`.
    pub fn idle_count(&self, target: &SiloId) -> usize {
        self.by_target
            .get(target)
            .map(|slot| slot.lock().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn silo(name: &str) -> SiloId {
        #[allow(clippy::unwrap_used)]
        SiloId::new(name).unwrap()
    }

    #[tokio::test]
    async fn acquire_creates_via_factory_when_empty() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(Duration::from_secs(30));
        let conn = pool.acquire(&silo("silo-a"), || async { Ok(7) }).await.unwrap();
        assert_eq!(conn, 7);
    }

    #[tokio::test]
    async fn release_then_acquire_reuses_connection() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(Duration::from_secs(30));
        pool.release(&silo("silo-a"), 7);
        assert_eq!(pool.idle_count(&silo("silo-a")), 1);

        let conn = pool
            .acquire(&silo("silo-a"), || async {
                panic!("factory should not run when an idle connection exists")
            })
            .await
            .unwrap();
        assert_eq!(conn, 7);
        assert_eq!(pool.idle_count(&silo("silo-a")), 0);
    }

    #[tokio::test]
    async fn reap_idle_drops_expired_connections() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(Duration::from_millis(10));
        pool.release(&silo("silo-a"), 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        pool.reap_idle();
        assert_eq!(pool.idle_count(&silo("silo-a")), 0);
    }

    #[tokio::test]
    async fn reap_idle_keeps_fresh_connections() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(Duration::from_secs(30));
        pool.release(&silo("silo-a"), 1);
        pool.reap_idle();
        assert_eq!(pool.idle_count(&silo("silo-a")), 1);
    }
}

//! Per-operation async locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use waypoint_types::operation::OperationId;

type LockMap = DashMap<OperationId, Arc<Mutex<()>>>;

/// One async mutex per operation id, created on first use and dropped from
/// the map once nobody holds or waits for it.
///
/// Control requests and the state-writing steps hold the guard across their
/// read-then-write so a resume can never observe a half-committed pause.
#[derive(Debug, Clone, Default)]
pub struct OperationLocks {
    inner: Arc<LockMap>,
}

impl OperationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: OperationId) -> OperationGuard {
        // Clone the Arc out so no DashMap guard is held across the await.
        let lock = Arc::clone(self.inner.entry(id).or_default().value());
        OperationGuard {
            guard: Some(lock.lock_owned().await),
            id,
            locks: Arc::clone(&self.inner),
        }
    }

    /// Number of operations with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Held lock for one operation.
///
/// Dropping it releases the mutex and removes the map entry when no other
/// task holds a reference to the same mutex.
#[derive(Debug)]
pub struct OperationGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: OperationId,
    locks: Arc<LockMap>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own reference left: no holder, no waiter.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::dao::models::GroupId;

/// Registry of per-group async mutexes serialising scans of the same group.
///
/// Locks are created on first use and evicted when the last holder or waiter
/// lets go, so the registry only holds groups with a scan in flight. Groups
/// never contend with each other.
#[derive(Default)]
pub struct GroupLocks {
    locks: DashMap<GroupId, Arc<Mutex<()>>>,
}

/// Exclusive access to one group; releases and evicts the lock on drop.
pub struct GroupGuard<'a> {
    id: GroupId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<GroupId, Arc<Mutex<()>>>,
}

impl GroupLocks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: GroupId) -> GroupGuard<'_> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self.locks.entry(id).or_default().clone();
        let guard = lock.lock_owned().await;
        GroupGuard {
            id,
            guard: Some(guard),
            locks: &self.locks,
        }
    }

    /// Number of groups with a scan holding or awaiting their lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// `true` when no scan is in flight.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, and `entry` takes the same shard lock,
        // so a count of one means nobody else can reach this mutex.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

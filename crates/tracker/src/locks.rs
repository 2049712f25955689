use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use watchlog_core::types::DbId;

/// Per-entry mutexes serializing commands on the same media entry.
///
/// Thread-safe via interior `RwLock`; different entries never contend.
pub struct EntryLocks {
    locks: RwLock<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl EntryLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `entry_id`. Hand the guard back through
    /// [`release`](Self::release) so idle mutexes are evicted.
    pub async fn lock(&self, entry_id: DbId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(&entry_id).cloned();
        let mutex = match existing {
            Some(mutex) => mutex,
            None => Arc::clone(self.locks.write().await.entry(entry_id).or_default()),
        };
        mutex.lock_owned().await
    }

    /// Unlock `entry_id` and evict its mutex if no other task holds or waits
    /// on it.
    pub async fn release(&self, entry_id: DbId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.write().await;
        // Clones are only taken under the map lock, so a count of 1 stays 1.
        if locks
            .get(&entry_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&entry_id);
        }
    }

    /// Number of entries with a mutex.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for EntryLocks {
    fn default() -> Self {
        Self::new()
    }
}

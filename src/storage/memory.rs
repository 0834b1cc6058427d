use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use super::{BucketState, Locked, Storage, StorageLock};
use crate::error::StorageResult;

type Slot = Arc<Mutex<Option<BucketState>>>;

/// In-process [`Storage`] keeping one lock-guarded slot per key.
///
/// Slots are created on first access and never removed, so memory grows with
/// the number of distinct keys ever seen. Waiters on the same key are served in
/// the order they started waiting.
///
/// # Example
///
/// ```rust
/// use rate_guard_buckets::storage::{BucketState, MemoryStorage, Storage};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), rate_guard_buckets::StorageError> {
/// let storage = MemoryStorage::new();
///
/// let (state, lock) = storage.get_and_lock("api:alice").await?;
/// assert_eq!(state, None);
/// lock.set_and_unlock(Some(BucketState::new(9.0, 0))).await?;
///
/// assert_eq!(storage.snapshot("api:alice").await, Some(BucketState::new(9.0, 0)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: DashMap<String, Slot>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with an allocated slot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reads the committed state of `key`, waiting for any holder of its lock.
    pub async fn snapshot(&self, key: &str) -> Option<BucketState> {
        let slot = self.slots.get(key).map(|slot| Arc::clone(slot.value()))?;
        let state = *slot.lock().await;
        state
    }

    fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        // The shard guard must be gone before awaiting the slot's mutex.
        let slot = self.slots.entry(key.to_owned()).or_default();
        Arc::clone(slot.value())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_and_lock(&self, key: &str) -> StorageResult<Locked> {
        let slot = self.slot(key);
        let guard = slot.lock_owned().await;
        trace!(key, "locked bucket slot");
        let state = *guard;
        let lock: Box<dyn StorageLock> = Box::new(MemoryLock { guard });
        Ok((state, lock))
    }
}

struct MemoryLock {
    guard: OwnedMutexGuard<Option<BucketState>>,
}

#[async_trait]
impl StorageLock for MemoryLock {
    async fn set_and_unlock(self: Box<Self>, state: Option<BucketState>) -> StorageResult<()> {
        let mut lock = *self;
        if let Some(state) = state {
            *lock.guard = Some(state);
        }
        Ok(())
    }
}

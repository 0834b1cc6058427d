//! Bucket state persistence with per-key mutual exclusion.
//!
//! A [`Storage`] hands out the stored [`BucketState`] for a key together with a
//! [`StorageLock`]. While the lock is alive no other caller can lock the same
//! key; other keys are unaffected. The lock is released exactly once, either by
//! [`StorageLock::set_and_unlock`] or by dropping it, so every exit path of the
//! caller (including `?` and cancelled futures) gives the key back.
//!
//! [`MemoryStorage`] is the in-process reference implementation. Networked
//! stores implement the same pair of traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::types::Timestamp;

pub mod memory;
pub use memory::MemoryStorage;

/// Persisted state of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketState {
    /// Tokens currently available. Fractional, never committed negative.
    pub count: f64,
    /// Timestamp of the last commit.
    pub last_change: Timestamp,
}

impl BucketState {
    pub fn new(count: f64, last_change: Timestamp) -> Self {
        BucketState { count, last_change }
    }
}

/// The state read by [`Storage::get_and_lock`] and the lock guarding it.
pub type Locked = (Option<BucketState>, Box<dyn StorageLock>);

/// Key-value store of [`BucketState`] with per-key exclusive locks.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Locks `key` and returns its current state (`None` if never written).
    ///
    /// Waits while another caller holds the lock for `key`. Locks are not
    /// reentrant: locking a key twice from the same task without releasing it
    /// deadlocks. On error the lock is not held.
    async fn get_and_lock(&self, key: &str) -> StorageResult<Locked>;
}

/// Release capability for a locked key.
///
/// Dropping the lock releases it without writing.
#[async_trait]
pub trait StorageLock: Send {
    /// Stores `state` (or keeps the current value for `None`) and releases the lock.
    async fn set_and_unlock(self: Box<Self>, state: Option<BucketState>) -> StorageResult<()>;
}

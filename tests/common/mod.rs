#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rate_guard_buckets::{
    BucketState, BucketType, BucketTypeConfig, Configuration, Locked, MemoryStorage, Storage,
    StorageError, StorageLock, StorageResult, Timestamp, TimestampProvider, TokenBucket, Uint,
};

/// A clock the test moves by hand.
#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn at(now: u64) -> Self {
        ManualClock(Arc::new(AtomicU64::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn provider(&self) -> TimestampProvider {
        let now = Arc::clone(&self.0);
        Arc::new(move || now.load(Ordering::SeqCst) as Timestamp)
    }
}

pub fn new_bucket_type(
    capacity: Uint,
    per_interval: Uint,
    interval: Uint,
    storage: Arc<dyn Storage>,
) -> Arc<BucketType> {
    Arc::new(BucketType::new(capacity, per_interval, interval, storage).unwrap())
}

/// A token bucket over a fresh memory storage, returned alongside that storage.
pub fn new_token_bucket(
    capacity: Uint,
    per_interval: Uint,
    interval: Uint,
    clock: &ManualClock,
) -> (TokenBucket, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let bucket_type = new_bucket_type(capacity, per_interval, interval, storage.clone());
    let bucket = TokenBucket::new("bucket-id", bucket_type)
        .unwrap()
        .with_timestamp_provider(clock.provider());
    (bucket, storage)
}

/// Storage whose `get_and_lock` always fails.
pub struct UnavailableStorage;

#[async_trait]
impl Storage for UnavailableStorage {
    async fn get_and_lock(&self, _key: &str) -> StorageResult<Locked> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

/// Storage serving a fixed state and recording what gets written back.
#[derive(Default)]
pub struct RecordingStorage {
    pub stored: Option<BucketState>,
    pub fail_commit: bool,
    pub locks: AtomicUsize,
    pub writes: Arc<parking_lot::Mutex<Vec<Option<BucketState>>>>,
}

impl RecordingStorage {
    pub fn with_state(count: f64, last_change: Timestamp) -> Self {
        RecordingStorage {
            stored: Some(BucketState::new(count, last_change)),
            ..Default::default()
        }
    }

    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Option<BucketState>> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get_and_lock(&self, _key: &str) -> StorageResult<Locked> {
        self.locks.fetch_add(1, Ordering::SeqCst);
        let lock: Box<dyn StorageLock> = Box::new(RecordingLock {
            fail: self.fail_commit,
            writes: Arc::clone(&self.writes),
        });
        Ok((self.stored, lock))
    }
}

struct RecordingLock {
    fail: bool,
    writes: Arc<parking_lot::Mutex<Vec<Option<BucketState>>>>,
}

#[async_trait]
impl StorageLock for RecordingLock {
    async fn set_and_unlock(self: Box<Self>, state: Option<BucketState>) -> StorageResult<()> {
        if self.fail && state.is_some() {
            return Err(StorageError::Unavailable("write timed out".to_string()));
        }
        self.writes.lock().push(state);
        Ok(())
    }
}

/// Configuration that counts lookups.
pub struct CountingConfiguration {
    types: HashMap<String, BucketTypeConfig>,
    lookups: AtomicUsize,
}

impl CountingConfiguration {
    pub fn new(types: &[(&str, BucketTypeConfig)]) -> Self {
        CountingConfiguration {
            types: types
                .iter()
                .map(|(name, config)| (name.to_string(), *config))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Configuration for CountingConfiguration {
    fn get(&self, bucket_type: &str) -> Option<BucketTypeConfig> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.types.get(bucket_type).copied()
    }
}

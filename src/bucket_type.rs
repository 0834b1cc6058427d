//! Immutable rate policy shared by every bucket of one type.

use std::fmt;
use std::sync::Arc;

use crate::config::BucketTypeConfig;
use crate::error::ValidationError;
use crate::storage::Storage;
use crate::types::Uint;

/// Validated policy parameters plus the storage its buckets persist to.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rate_guard_buckets::{BucketType, MemoryStorage};
///
/// // 10 tokens max, refilling 1 token every 1000 ms
/// let bucket_type = BucketType::new(10, 1, 1000, Arc::new(MemoryStorage::new())).unwrap();
/// assert_eq!(bucket_type.refill_rate(), 0.001);
///
/// // Zero capacity is rejected
/// let err = BucketType::new(0, 1, 1000, Arc::new(MemoryStorage::new())).unwrap_err();
/// assert_eq!(err.field(), "capacity");
/// ```
#[derive(Clone)]
pub struct BucketType {
    capacity: Uint,
    per_interval: Uint,
    interval: Uint,
    storage: Arc<dyn Storage>,
}

impl BucketType {
    /// Creates a bucket type.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NotPositive`] naming the first of `capacity`,
    /// `perInterval`, `interval` that is zero.
    pub fn new(
        capacity: Uint,
        per_interval: Uint,
        interval: Uint,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, ValidationError> {
        Self::from_config(&BucketTypeConfig::new(capacity, per_interval, interval), storage)
    }

    /// Creates a bucket type from configured policy values.
    pub fn from_config(
        config: &BucketTypeConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(BucketType {
            capacity: config.capacity,
            per_interval: config.per_interval,
            interval: config.interval,
            storage,
        })
    }

    pub fn capacity(&self) -> Uint {
        self.capacity
    }

    pub fn per_interval(&self) -> Uint {
        self.per_interval
    }

    pub fn interval(&self) -> Uint {
        self.interval
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Tokens gained per timestamp unit.
    pub fn refill_rate(&self) -> f64 {
        self.per_interval as f64 / self.interval as f64
    }

    /// Tokens gained over `elapsed` timestamp units, before the capacity cap.
    pub(crate) fn refill_over(&self, elapsed: Uint) -> f64 {
        elapsed as f64 * self.per_interval as f64 / self.interval as f64
    }
}

impl fmt::Debug for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketType")
            .field("capacity", &self.capacity)
            .field("per_interval", &self.per_interval)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

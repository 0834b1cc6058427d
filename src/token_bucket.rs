use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::bucket_type::BucketType;
use crate::clock::{system_timestamp_provider, TimestampProvider};
use crate::error::{StorageResult, ValidationError};
use crate::rate_limit::Bucket;
use crate::storage::BucketState;
use crate::types::{Timestamp, Uint, MAX_IDENTIFIER_LEN};

/// Token bucket over a lock-guarded [`Storage`](crate::Storage) slot.
///
/// The bucket starts full with `capacity` tokens and refills continuously at
/// `per_interval / interval` tokens per timestamp unit, never beyond
/// `capacity`. Refill is fractional, so no time is lost between takes.
///
/// # Algorithm Behavior
///
/// Every [`take`](TokenBucket::take) runs under the storage lock of the
/// bucket's identifier:
///
/// - A bucket with no stored state is treated as full at the current timestamp
/// - Tokens accrued since the last commit are added, capped at capacity
/// - A clock that appears to go backwards adds nothing
/// - If the requested amount fits, the reduced count is committed with the
///   current timestamp
/// - Otherwise nothing is written: a denied take never advances the refill clock
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rate_guard_buckets::{BucketType, MemoryStorage, TokenBucket};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // 10 tokens, refilling 1 token every 100 ticks; the clock is frozen at 0
/// let bucket_type = Arc::new(BucketType::new(10, 1, 100, Arc::new(MemoryStorage::new()))?);
/// let bucket = TokenBucket::new("api:alice", bucket_type)?
///     .with_timestamp_provider(Arc::new(|| 0));
///
/// assert!(bucket.take(10).await?);
/// assert!(!bucket.take(1).await?);
/// # Ok(())
/// # }
/// ```
pub struct TokenBucket {
    identifier: String,
    bucket_type: Arc<BucketType>,
    timestamp_provider: TimestampProvider,
}

impl TokenBucket {
    /// Creates a bucket reading the wall clock.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyIdentifier`] or
    /// [`ValidationError::IdentifierTooLong`] if `identifier` is not a usable
    /// storage key.
    pub fn new(
        identifier: impl Into<String>,
        bucket_type: Arc<BucketType>,
    ) -> Result<Self, ValidationError> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(TokenBucket {
            identifier,
            bucket_type,
            timestamp_provider: system_timestamp_provider(),
        })
    }

    /// Replaces the time source.
    pub fn with_timestamp_provider(mut self, timestamp_provider: TimestampProvider) -> Self {
        self.timestamp_provider = timestamp_provider;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn bucket_type(&self) -> &Arc<BucketType> {
        &self.bucket_type
    }

    /// Attempts to consume `amount` tokens.
    ///
    /// # Returns
    /// * `Ok(true)` - The tokens were taken and the new state committed
    /// * `Ok(false)` - Not enough tokens; the stored state is left untouched
    /// * `Err(StorageError)` - Locking or committing failed
    pub async fn take(&self, amount: Uint) -> StorageResult<bool> {
        let storage = self.bucket_type.storage();
        let (state, lock) = storage.get_and_lock(&self.identifier).await.map_err(|err| {
            warn!(identifier = %self.identifier, error = %err, "failed to lock bucket");
            err
        })?;

        let now = (self.timestamp_provider)();
        let available = self.available_at(state, now);
        let projected = available - amount as f64;

        if projected < 0.0 {
            debug!(
                identifier = %self.identifier,
                amount = %amount,
                available,
                "take denied"
            );
            lock.set_and_unlock(None).await?;
            return Ok(false);
        }

        lock.set_and_unlock(Some(BucketState::new(projected, now)))
            .await
            .map_err(|err| {
                warn!(identifier = %self.identifier, error = %err, "failed to commit bucket state");
                err
            })?;
        trace!(identifier = %self.identifier, amount = %amount, remaining = projected, "take committed");
        Ok(true)
    }

    /// Gets the number of tokens that could be taken right now.
    ///
    /// The refill is computed under the bucket's lock but never committed.
    pub async fn remaining(&self) -> StorageResult<f64> {
        let (state, lock) = self.bucket_type.storage().get_and_lock(&self.identifier).await?;
        let available = self.available_at(state, (self.timestamp_provider)());
        lock.set_and_unlock(None).await?;
        Ok(available)
    }

    /// Refilled token count at `now`, starting full when nothing is stored.
    fn available_at(&self, state: Option<BucketState>, now: Timestamp) -> f64 {
        let capacity = self.bucket_type.capacity() as f64;
        let state = state.unwrap_or(BucketState::new(capacity, now));
        let elapsed = now.saturating_sub(state.last_change);
        (state.count + self.bucket_type.refill_over(elapsed)).min(capacity)
    }
}

#[async_trait]
impl Bucket for TokenBucket {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn take(&self, amount: Uint) -> StorageResult<bool> {
        TokenBucket::take(self, amount).await
    }
}

impl fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBucket")
            .field("identifier", &self.identifier)
            .field("bucket_type", &self.bucket_type)
            .finish_non_exhaustive()
    }
}

fn validate_identifier(identifier: &str) -> Result<(), ValidationError> {
    let len = identifier.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyIdentifier);
    }
    if len > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::identifier_too_long(len));
    }
    Ok(())
}

/// Configuration structure for creating a `TokenBucket`.
#[derive(Clone)]
pub struct TokenBucketConfig {
    /// Storage key of the bucket.
    pub identifier: String,
    /// Policy the bucket follows.
    pub bucket_type: Arc<BucketType>,
    /// Time source; the wall clock when `None`.
    pub timestamp_provider: Option<TimestampProvider>,
}

impl TryFrom<TokenBucketConfig> for TokenBucket {
    type Error = ValidationError;

    /// Converts a `TokenBucketConfig` into a `TokenBucket`.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use rate_guard_buckets::{BucketType, MemoryStorage, TokenBucket, TokenBucketConfig};
    ///
    /// let bucket_type = Arc::new(BucketType::new(100, 5, 10, Arc::new(MemoryStorage::new())).unwrap());
    /// let bucket: TokenBucket = TokenBucketConfig {
    ///     identifier: "search:42".to_string(),
    ///     bucket_type,
    ///     timestamp_provider: None,
    /// }
    /// .try_into()
    /// .unwrap();
    /// assert_eq!(bucket.identifier(), "search:42");
    /// ```
    fn try_from(config: TokenBucketConfig) -> Result<Self, Self::Error> {
        let bucket = TokenBucket::new(config.identifier, config.bucket_type)?;
        Ok(match config.timestamp_provider {
            Some(provider) => bucket.with_timestamp_provider(provider),
            None => bucket,
        })
    }
}

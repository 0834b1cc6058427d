//! Caller-facing admission entry point.

use std::sync::Arc;

use tracing::debug;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::registry::BucketRegistry;
use crate::types::Uint;

/// Turns `(type, instance, amount)` requests into admission decisions.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rate_guard_buckets::{BucketTypeConfig, Error, RateLimiter, StaticConfiguration};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StaticConfiguration::from_map([
///     ("login".to_string(), BucketTypeConfig::new(3, 1, 60_000)),
/// ])?;
/// let limiter = RateLimiter::from_configuration(Arc::new(config));
///
/// assert!(limiter.take("login", "alice", 3).await?);
/// assert!(!limiter.take("login", "alice", 1).await?);
/// assert!(limiter.take("login", "bob", 1).await?);
///
/// match limiter.take("signup", "alice", 1).await {
///     Err(Error::InvalidBucketType(bucket_type)) => assert_eq!(bucket_type, "signup"),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    registry: BucketRegistry,
}

impl RateLimiter {
    pub fn new(registry: BucketRegistry) -> Self {
        RateLimiter { registry }
    }

    /// A limiter over `configuration` backed by a fresh in-memory storage.
    pub fn from_configuration(configuration: Arc<dyn Configuration>) -> Self {
        Self::new(BucketRegistry::builder(configuration).build())
    }

    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    /// Attempts to take `amount` tokens from the bucket of `instance_id` of `bucket_type`.
    ///
    /// # Returns
    /// * `Ok(true)` / `Ok(false)` - The admission decision
    /// * `Err(Error::InvalidBucketType)` - `bucket_type` is not configured
    /// * `Err(Error::Validation)` - The configured policy or identifier is invalid
    /// * `Err(Error::Storage)` - The backing store failed
    pub async fn take(&self, bucket_type: &str, instance_id: &str, amount: Uint) -> Result<bool> {
        let Some(bucket) = self.registry.get(bucket_type, instance_id)? else {
            return Err(Error::InvalidBucketType(bucket_type.to_owned()));
        };
        let allowed = bucket.take(amount).await?;
        debug!(bucket = bucket.identifier(), amount = %amount, allowed, "admission decision");
        Ok(allowed)
    }
}

//! Core trait for bucket handles.
//!
//! The registry hands out buckets as `Arc<dyn Bucket>`, which lets a custom
//! [`BucketFactory`](crate::registry::BucketFactory) substitute its own
//! implementation for [`TokenBucket`](crate::TokenBucket).

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::Uint;

/// A handle bound to one `(type, instance)` pair.
///
/// Implementations are stateless handles; the bucket's state lives in storage.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// The storage key of this bucket, `"<type>:<instance>"` for registry-built buckets.
    fn identifier(&self) -> &str;

    /// Attempts to consume `amount` tokens.
    ///
    /// # Returns
    /// * `Ok(true)` if the tokens were taken
    /// * `Ok(false)` if not enough tokens are available; nothing is consumed
    /// * `Err(StorageError)` if the backing store failed
    async fn take(&self, amount: Uint) -> StorageResult<bool>;
}

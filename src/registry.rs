//! Memoized access to bucket types and bucket handles.
//!
//! [`BucketRegistry::get`] resolves a bucket type from the [`Configuration`] at
//! most once per type name and builds at most one handle per
//! `(type, instance)` pair. Both caches live as long as the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::bucket_type::BucketType;
use crate::clock::{system_timestamp_provider, TimestampProvider};
use crate::config::Configuration;
use crate::error::ValidationError;
use crate::rate_limit::Bucket;
use crate::storage::{MemoryStorage, Storage};
use crate::token_bucket::TokenBucket;

/// Builds the bucket handle for an identifier and its resolved type.
///
/// Runs while the registry holds the instance cache entry for the identifier,
/// so it must not call back into the same registry.
pub type BucketFactory =
    Arc<dyn Fn(&str, Arc<BucketType>) -> Result<Arc<dyn Bucket>, ValidationError> + Send + Sync>;

/// The default factory: a [`TokenBucket`] reading time from `timestamp_provider`.
pub fn token_bucket_factory(timestamp_provider: TimestampProvider) -> BucketFactory {
    Arc::new(
        move |identifier: &str, bucket_type: Arc<BucketType>| -> Result<Arc<dyn Bucket>, ValidationError> {
            let bucket = TokenBucket::new(identifier, bucket_type)?
                .with_timestamp_provider(Arc::clone(&timestamp_provider));
            Ok(Arc::new(bucket))
        },
    )
}

/// Cache of bucket types and bucket handles.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use rate_guard_buckets::{BucketRegistry, BucketTypeConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut types = HashMap::new();
/// types.insert("api".to_string(), BucketTypeConfig::new(2, 1, 1000));
///
/// let registry = BucketRegistry::builder(Arc::new(types)).build();
///
/// let bucket = registry.get("api", "alice")?.expect("configured type");
/// assert_eq!(bucket.identifier(), "api:alice");
/// assert!(bucket.take(2).await?);
///
/// assert!(registry.get("unknown", "alice")?.is_none());
/// # Ok(())
/// # }
/// ```
pub struct BucketRegistry {
    configuration: Arc<dyn Configuration>,
    storage: Arc<dyn Storage>,
    type_storage: HashMap<String, Arc<dyn Storage>>,
    bucket_factory: BucketFactory,
    types: Mutex<HashMap<String, Arc<BucketType>>>,
    instances: DashMap<String, Arc<dyn Bucket>>,
}

impl BucketRegistry {
    /// Starts a registry over `configuration`, the source of bucket type policies.
    pub fn builder(configuration: Arc<dyn Configuration>) -> BucketRegistryBuilder {
        BucketRegistryBuilder {
            configuration,
            storage: None,
            type_storage: HashMap::new(),
            bucket_factory: None,
            timestamp_provider: None,
        }
    }

    /// Returns the bucket for `instance_id` of `bucket_type`.
    ///
    /// # Returns
    /// * `Ok(Some(bucket))` - The cached handle, or a new one on first access
    /// * `Ok(None)` - `bucket_type` is not configured; storage is not touched
    /// * `Err(ValidationError)` - The configured policy or the resulting
    ///   identifier is invalid
    pub fn get(
        &self,
        bucket_type: &str,
        instance_id: &str,
    ) -> Result<Option<Arc<dyn Bucket>>, ValidationError> {
        let key = format!("{bucket_type}:{instance_id}");
        if let Some(bucket) = self.instances.get(&key) {
            return Ok(Some(Arc::clone(bucket.value())));
        }

        // Resolved before the entry is taken, so no registry lock is ever held
        // while another is acquired.
        let Some(resolved) = self.resolve_type(bucket_type)? else {
            return Ok(None);
        };

        // The entry guard serializes concurrent first accesses to `key`.
        match self.instances.entry(key) {
            Entry::Occupied(entry) => Ok(Some(Arc::clone(entry.get()))),
            Entry::Vacant(entry) => {
                let bucket = (self.bucket_factory)(entry.key().as_str(), resolved)?;
                entry.insert(Arc::clone(&bucket));
                Ok(Some(bucket))
            }
        }
    }

    /// Looks up `bucket_type`, building and caching it on first use.
    fn resolve_type(&self, bucket_type: &str) -> Result<Option<Arc<BucketType>>, ValidationError> {
        let mut types = self.types.lock();
        if let Some(resolved) = types.get(bucket_type) {
            return Ok(Some(Arc::clone(resolved)));
        }

        let Some(config) = self.configuration.get(bucket_type) else {
            debug!(bucket_type, "unknown bucket type");
            return Ok(None);
        };

        let storage = self
            .type_storage
            .get(bucket_type)
            .unwrap_or(&self.storage);
        let resolved = Arc::new(BucketType::from_config(&config, Arc::clone(storage))?);
        debug!(
            bucket_type,
            capacity = %config.capacity,
            per_interval = %config.per_interval,
            interval = %config.interval,
            "resolved bucket type"
        );
        types.insert(bucket_type.to_owned(), Arc::clone(&resolved));
        Ok(Some(resolved))
    }

    /// Number of cached bucket handles.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl fmt::Debug for BucketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.types.lock().len();
        f.debug_struct("BucketRegistry")
            .field("types", &types)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`BucketRegistry`], created by [`BucketRegistry::builder`].
pub struct BucketRegistryBuilder {
    configuration: Arc<dyn Configuration>,
    storage: Option<Arc<dyn Storage>>,
    type_storage: HashMap<String, Arc<dyn Storage>>,
    bucket_factory: Option<BucketFactory>,
    timestamp_provider: Option<TimestampProvider>,
}

impl BucketRegistryBuilder {
    /// Storage shared by every bucket type without an override. Defaults to a
    /// fresh [`MemoryStorage`].
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Storage used only by buckets of `bucket_type`.
    pub fn type_storage(mut self, bucket_type: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        self.type_storage.insert(bucket_type.into(), storage);
        self
    }

    /// Replaces the default [`token_bucket_factory`].
    pub fn bucket_factory(mut self, bucket_factory: BucketFactory) -> Self {
        self.bucket_factory = Some(bucket_factory);
        self
    }

    /// Time source handed to buckets built by the default factory.
    pub fn timestamp_provider(mut self, timestamp_provider: TimestampProvider) -> Self {
        self.timestamp_provider = Some(timestamp_provider);
        self
    }

    /// Builds the registry.
    pub fn build(self) -> BucketRegistry {
        let bucket_factory = self.bucket_factory.unwrap_or_else(|| {
            token_bucket_factory(self.timestamp_provider.unwrap_or_else(system_timestamp_provider))
        });
        BucketRegistry {
            configuration: self.configuration,
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            type_storage: self.type_storage,
            bucket_factory,
            types: Mutex::new(HashMap::new()),
            instances: DashMap::new(),
        }
    }
}

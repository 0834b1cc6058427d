//! Keyed token-bucket rate limiting over pluggable, lock-guarded storage.
//!
//! A *bucket type* is a named rate policy (capacity, tokens per interval,
//! interval). A *bucket* is one throttled entity of a type, such as a customer
//! id. Asking to take tokens from a bucket yields an admission decision:
//! `true` if the tokens were consumed, `false` if not enough have accrued.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rate_guard_buckets::{BucketTypeConfig, RateLimiter, StaticConfiguration};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // "api" buckets hold up to 100 tokens and regain 10 tokens every 1000 ms
//! let config = StaticConfiguration::from_map([
//!     ("api".to_string(), BucketTypeConfig::new(100, 10, 1000)),
//! ])?;
//! let limiter = RateLimiter::from_configuration(Arc::new(config));
//!
//! if limiter.take("api", "customer-42", 20).await? {
//!     println!("Request allowed");
//! } else {
//!     println!("Request denied");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - **[`Storage`]** - Key-value store of [`BucketState`] with per-key locks.
//!   [`MemoryStorage`] is the in-process implementation; networked stores plug
//!   in through the same trait.
//! - **[`TokenBucket`]** - The refill/consume algorithm for one bucket, run
//!   under its storage lock.
//! - **[`BucketType`]** - Validated policy plus the storage its buckets use.
//! - **[`BucketRegistry`]** - Resolves each type once and caches one handle per
//!   `(type, instance)`.
//! - **[`Configuration`]** - Policy lookup by type name.
//! - **[`RateLimiter`]** - `take(type, instance, amount)` for callers.
//!
//! # Core Concepts
//!
//! ## Time Representation
//! Buckets read time from an injectable [`TimestampProvider`]. The default is
//! wall-clock milliseconds, so intervals are in milliseconds unless a
//! different clock is supplied.
//!
//! ## Refill
//! Tokens accrue continuously at `per_interval / interval` per time unit and
//! are capped at `capacity`. A denied request writes nothing, so failed bursts
//! never move the refill clock.
//!
//! ## Error Handling
//! - **[`Error::InvalidBucketType`]** - The type has no configuration entry
//! - **[`Error::Validation`]** - A policy value or identifier is malformed
//! - **[`Error::Storage`]** - The backing store failed; never retried here
//!
//! Running out of tokens is `Ok(false)`, not an error.
//!
//! ## Concurrency
//! Takes on the same bucket are serialized by the storage lock of its key and
//! run in lock-acquisition order. Takes on different buckets never contend.
//! There is no cancellation inside a take; dropping its future releases the
//! lock without committing.

pub mod bucket_type;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod rate_limit;
pub mod registry;
pub mod storage;
pub mod token_bucket;
pub mod types;

pub use bucket_type::BucketType;
pub use clock::{system_timestamp, system_timestamp_provider, TimestampProvider};
pub use config::{BucketTypeConfig, Configuration, StaticConfiguration};
pub use error::{Error, Result, StorageError, StorageResult, ValidationError};
pub use limiter::RateLimiter;
pub use rate_limit::Bucket;
pub use registry::{token_bucket_factory, BucketFactory, BucketRegistry, BucketRegistryBuilder};
pub use storage::{BucketState, Locked, MemoryStorage, Storage, StorageLock};
pub use token_bucket::{TokenBucket, TokenBucketConfig};
pub use types::{Timestamp, Uint, MAX_IDENTIFIER_LEN};

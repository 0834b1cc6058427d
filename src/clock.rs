//! Timestamp sources.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Timestamp;

/// Source of the current time, injected into buckets so the algorithm does not
/// depend on the wall clock.
pub type TimestampProvider = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Milliseconds since the Unix epoch. A clock set before the epoch reads as 0.
pub fn system_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}

/// The default provider, backed by [`system_timestamp`].
pub fn system_timestamp_provider() -> TimestampProvider {
    Arc::new(system_timestamp)
}

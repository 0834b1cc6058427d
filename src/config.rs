//! Rate policy configuration.
//!
//! A [`Configuration`] maps a bucket type name to its [`BucketTypeConfig`].
//! Loading configuration from files is left to the caller; the types here
//! derive `serde` traits so any format works.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Uint;

/// Policy parameters of one bucket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BucketTypeConfig {
    /// Maximum number of tokens a bucket may hold.
    pub capacity: Uint,
    /// Tokens added per `interval`.
    pub per_interval: Uint,
    /// Refill period, in timestamp units.
    pub interval: Uint,
}

impl BucketTypeConfig {
    /// Creates a new configuration instance.
    pub fn new(capacity: Uint, per_interval: Uint, interval: Uint) -> Self {
        Self {
            capacity,
            per_interval,
            interval,
        }
    }

    /// Checks that every field is positive, reporting the first that is not by
    /// its serialized name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("capacity", self.capacity),
            ("perInterval", self.per_interval),
            ("interval", self.interval),
        ] {
            if value == 0 {
                return Err(ValidationError::NotPositive { field });
            }
        }
        Ok(())
    }
}

/// Lookup of rate policies by bucket type name.
pub trait Configuration: Send + Sync {
    /// Returns the policy for `bucket_type`, or `None` if it is not configured.
    fn get(&self, bucket_type: &str) -> Option<BucketTypeConfig>;
}

impl Configuration for HashMap<String, BucketTypeConfig> {
    fn get(&self, bucket_type: &str) -> Option<BucketTypeConfig> {
        HashMap::get(self, bucket_type).copied()
    }
}

/// A fixed, validated set of bucket types.
///
/// ```rust
/// use rate_guard_buckets::config::{BucketTypeConfig, Configuration, StaticConfiguration};
///
/// let config = StaticConfiguration::from_map([
///     ("api".to_string(), BucketTypeConfig::new(10, 1, 1000)),
/// ]).unwrap();
///
/// assert_eq!(config.get("api"), Some(BucketTypeConfig::new(10, 1, 1000)));
/// assert_eq!(config.get("unknown"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, BucketTypeConfig>", into = "HashMap<String, BucketTypeConfig>")]
pub struct StaticConfiguration {
    types: HashMap<String, BucketTypeConfig>,
}

impl StaticConfiguration {
    /// Validates type names and policies and builds the configuration.
    pub fn from_map<I>(types: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (String, BucketTypeConfig)>,
    {
        let types = types
            .into_iter()
            .map(|(name, policy)| {
                validate_type_name(&name)?;
                policy.validate()?;
                Ok((name, policy))
            })
            .collect::<Result<HashMap<_, _>, ValidationError>>()?;
        Ok(Self { types })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Configured type names, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Configuration for StaticConfiguration {
    fn get(&self, bucket_type: &str) -> Option<BucketTypeConfig> {
        self.types.get(bucket_type).copied()
    }
}

impl TryFrom<HashMap<String, BucketTypeConfig>> for StaticConfiguration {
    type Error = ValidationError;

    fn try_from(types: HashMap<String, BucketTypeConfig>) -> Result<Self, Self::Error> {
        Self::from_map(types)
    }
}

impl From<StaticConfiguration> for HashMap<String, BucketTypeConfig> {
    fn from(config: StaticConfiguration) -> Self {
        config.types
    }
}

/// Type names end up in `"<type>:<instance>"` keys, so `:` and friends are rejected.
fn validate_type_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidTypeName(name.to_owned()))
    }
}

//! error.rs
//! Error types for bucket construction, storage access and admission requests.

use thiserror::Error;

use crate::types::MAX_IDENTIFIER_LEN;

/// Malformed construction parameters. Fatal at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A policy value that must be a positive integer was zero.
    #[error("`{field}` must be greater than 0")]
    NotPositive { field: &'static str },

    /// A bucket identifier was empty.
    #[error("`identifier` must not be empty")]
    EmptyIdentifier,

    /// A bucket identifier is too long to be used as a storage key.
    #[error("`identifier` must be at most {max} characters, got {len}")]
    IdentifierTooLong { len: usize, max: usize },

    /// A configured bucket type name contains characters outside `[-a-zA-Z0-9]`.
    #[error("invalid bucket type name {0:?}: only ASCII letters, digits and '-' are allowed")]
    InvalidTypeName(String),
}

impl ValidationError {
    pub(crate) fn identifier_too_long(len: usize) -> Self {
        ValidationError::IdentifierTooLong {
            len,
            max: MAX_IDENTIFIER_LEN,
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotPositive { field } => field,
            ValidationError::EmptyIdentifier | ValidationError::IdentifierTooLong { .. } => {
                "identifier"
            }
            ValidationError::InvalidTypeName(_) => "type",
        }
    }
}

/// The backing store failed to read, write or lock.
///
/// Propagated unmodified to the caller; the core never retries.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying medium could not be reached. No lock is held.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other failure reported by a storage implementation.
    #[error("storage operation failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps an implementation-specific error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Backend(Box::new(err))
    }
}

/// Errors surfaced by [`RateLimiter::take`](crate::RateLimiter::take).
///
/// Running out of tokens is not an error: it is an `Ok(false)` admission decision.
#[derive(Debug, Error)]
pub enum Error {
    /// Bucket construction rejected its parameters.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested bucket type has no configuration entry.
    #[error("Invalid bucket type {0}")]
    InvalidBucketType(String),

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for admission requests.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

//! Integer aliases for bucket policies, token amounts and timestamps.
//!
//! The width of these types is chosen at compile time via feature flags.
//!
//! # Features
//! - `tick-u64` (default): [`Uint`] and [`Timestamp`] are [`u64`]
//! - `tick-u128`: [`Uint`] and [`Timestamp`] are [`u128`]
//!   (Both features cannot be enabled at the same time.)
//! - If neither feature is enabled, `u64` is used.

#[cfg(all(feature = "tick-u64", feature = "tick-u128"))]
compile_error!("You cannot enable both `tick-u64` and `tick-u128` features at the same time");

/// Unsigned integer used for capacities, refill amounts, intervals and
/// requested token amounts.
#[cfg(not(feature = "tick-u128"))]
pub type Uint = u64;

/// Unsigned integer used for capacities, refill amounts, intervals and
/// requested token amounts.
#[cfg(all(feature = "tick-u128", not(feature = "tick-u64")))]
pub type Uint = u128;

/// A point in time, in the unit the bucket intervals are expressed in
/// (milliseconds since the Unix epoch with the default clock).
pub type Timestamp = Uint;

/// Maximum length of a bucket identifier, since it doubles as a storage key.
pub const MAX_IDENTIFIER_LEN: usize = 100;

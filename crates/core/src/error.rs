//! Error types shared by every layer of the engine.
//!
//! Configuration errors and resource overflows are the only conditions
//! this crate itself can raise (data parsing and structural-precondition
//! violations are raised by the higher crates that own that state). All
//! variants are fatal — there is no silent recovery path.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the foundational types (`J`, `JProduct`, limits).
#[derive(Debug, Error)]
pub enum Error {
    /// The monotone J counter would overflow `u32::MAX`.
    #[error("J counter exhausted: cannot assign index beyond {0}")]
    JCounterExhausted(u32),

    /// A vector grew past the 2^32 - 1 content-length limit.
    #[error("vector length {len} exceeds the 2^32-1 storage limit")]
    LengthOverflow {
        /// Offending length.
        len: u64,
    },

    /// A `JProduct` was constructed with a factor list that was empty where
    /// a non-empty list was required, or contained a duplicate factor.
    #[error("invalid product feature: {0}")]
    InvalidProduct(String),

    /// A configuration value violated a precondition.
    #[error("configuration error: {0}")]
    Configuration(String),
}

//! Errors raised by sparse storage operations.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`crate::csr::CsrMatrix`], [`crate::coo::CooMatrix`],
/// and the shard set.
#[derive(Debug, Error)]
pub enum Error {
    /// A resource limit was exceeded.
    #[error(transparent)]
    Core(#[from] lre_core::Error),

    /// A row index was out of bounds.
    #[error("row index {0} out of bounds for {1} rows")]
    RowOutOfBounds(u32, u32),

    /// A COO matrix was converted to CSR before being sorted.
    #[error("COO matrix must be sorted before converting to CSR")]
    UnsortedCoo,
}

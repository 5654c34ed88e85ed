//! Errors raised by the optimizers and model.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by majorizer construction, the optimizers, and the model.
#[derive(Debug, Error)]
pub enum Error {
    /// A storage-layer limit or renumbering mismatch.
    #[error(transparent)]
    Storage(#[from] lre_storage::Error),

    /// A core resource limit was exceeded.
    #[error(transparent)]
    Core(#[from] lre_core::Error),

    /// SGD was asked to run with a non-`base` regularization variant set.
    #[error("SGD requires standard (base-only) regularization; div_sqrt_n/mul_sqrt_n/confidence must be zero")]
    NonStandardRegularizationForSgd,

    /// A `maybe_reduce` factor was outside `(0, 1)`.
    #[error("maybe_reduce factor {0} is not in (0, 1)")]
    InvalidReduceFactor(f64),

    /// A model file was malformed.
    #[error("malformed model file: {0}")]
    MalformedModel(String),
}

//! Errors raised while exploring or pruning the feature universe.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`crate::exploration::FeatureExploration`] and
/// [`crate::pruning::FeaturePruning`].
#[derive(Debug, Error)]
pub enum Error {
    /// A resource limit from the foundational types was exceeded.
    #[error(transparent)]
    Core(#[from] lre_core::Error),

    /// A bimap or renumbering operation failed.
    #[error(transparent)]
    Concurrency(#[from] lre_concurrency::Error),

    /// A sparse-storage operation failed.
    #[error(transparent)]
    Storage(#[from] lre_storage::Error),

    /// Pruning was configured with none of `score_threshold`, `top_count`,
    /// `top_fraction` set; at least one is required.
    #[error(
        "pruning requires at least one of score_threshold, top_count, top_fraction to be set"
    )]
    NoStoppingCondition,
}

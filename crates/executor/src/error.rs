//! Errors raised while configuring, logging, or driving the `World`.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`crate::config`], [`crate::command`], and
/// [`crate::world::World`].
#[derive(Debug, Error)]
pub enum Error {
    /// A foundational-type limit was exceeded.
    #[error(transparent)]
    Core(#[from] lre_core::Error),

    /// A feature-universe or renumbering error.
    #[error(transparent)]
    Concurrency(#[from] lre_concurrency::Error),

    /// A sparse-storage error.
    #[error(transparent)]
    Storage(#[from] lre_storage::Error),

    /// An optimizer or model error.
    #[error(transparent)]
    Engine(#[from] lre_engine::Error),

    /// An exploration or pruning error.
    #[error(transparent)]
    Explore(#[from] lre_explore::Error),

    /// A `set` option, or the config loaded from file, failed validation
    /// before any training ran.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A command referenced a feature name that has never been interned.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// `run_sgd`/`sgd` was requested before `Sgd` had been constructed
    /// (the regularization variant in effect at that time must be
    /// base-only; see [`lre_engine::Error::NonStandardRegularizationForSgd`]).
    #[error("SGD has not been initialized for the current regularization configuration")]
    SgdNotInitialized,

    /// A model or log file could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),
}

//! Errors raised while interning or renumbering the feature universe.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`crate::bimap::ConcurrentBimap`] and [`crate::renumbering::Renumbering`].
#[derive(Debug, Error)]
pub enum Error {
    /// The monotone J counter has been exhausted.
    #[error(transparent)]
    Core(#[from] lre_core::Error),

    /// A renumbering referenced a `J` outside `[0, j_size)`.
    #[error("renumbering index {0} is out of bounds for J space of size {1}")]
    RenumberOutOfBounds(u32, u32),
}

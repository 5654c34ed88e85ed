//! Foundational types for the logistic-regression training engine.
//!
//! This crate defines the vocabulary every other crate in the workspace
//! builds on:
//! - [`J`] / [`INVALID_J`]: dense feature indices and the renumbering
//!   tombstone.
//! - [`FeatureName`]: atomic string-named boolean features.
//! - [`JProduct`]: conjunctions of atomic `J`'s.
//! - [`Label`]: the `{+1, -1}` training label.
//! - [`Error`] / [`Result`]: the error hierarchy.
//! - [`Limits`]: resource ceilings.

#![warn(missing_docs)]

pub mod error;
pub mod feature;
pub mod limits;
pub mod types;

pub use error::{Error, Result};
pub use feature::JProduct;
pub use limits::Limits;
pub use types::{FeatureName, Label, RowId, UserId, INVALID_ID, INVALID_J, J};

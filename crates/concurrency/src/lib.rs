//! Thread-safe `FeatureMap`/`ProductMap` bimaps and feature-universe
//! renumbering.

#![warn(missing_docs)]

pub mod bimap;
pub mod error;
pub mod feature_map;
pub mod product_map;
pub mod renumbering;

pub use bimap::{Bimap, ConcurrentBimap};
pub use error::{Error, Result};
pub use feature_map::FeatureMap;
pub use product_map::ProductMap;
pub use renumbering::Renumbering;

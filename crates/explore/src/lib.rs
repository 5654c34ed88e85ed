//! Feature-universe exploration (proposing new product conjunctions) and
//! pruning (removing low-value J's), both driven by the scoring
//! strategies in [`scoring`].

#![warn(missing_docs)]

pub mod error;
pub mod exploration;
pub mod pruning;
pub mod scoring;

pub use error::{Error, Result};
pub use exploration::{ExplorationConfig, ExplorationReport, FeatureExploration};
pub use pruning::{FeaturePruning, PruningConfig, PruningReport};
pub use scoring::{compute_scores, ScoreShaping, ScoreStrategy};

//! Training optimizers: the batch majorizer pass (`GradBoost`) and
//! asynchronous Hogwild SGD, plus the weight model, regularization, and
//! worker-pool plumbing both optimizers share.

#![warn(missing_docs)]

pub mod error;
pub mod evaluator;
pub mod gradboost;
pub mod majorizer;
pub mod model;
pub mod pool;
pub mod regularization;
pub mod sgd;
pub mod worker_pool;

pub use error::{Error, Result};
pub use evaluator::{EvaluationMetrics, Evaluator};
pub use gradboost::{GradBoost, GradBoostConfig, IterationLog};
pub use majorizer::{CoordinateUpdateResult, Dim1Majorizer, Majorizer, UpdateParams};
pub use model::Model;
pub use pool::{MajorizerPool, PooledMajorizer};
pub use regularization::{EffectiveRegularization, RegularizationTerm, Regularizations};
pub use sgd::{LearningRateSchedule, Sgd, SgdConfig, SgdPassLog, TrainingMode};
pub use worker_pool::Schedule;

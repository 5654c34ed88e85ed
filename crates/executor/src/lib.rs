//! Command dispatch, configuration, and domain logging for the
//! single-machine logistic-regression training engine.
//!
//! [`world::World`] is the aggregate that owns every structural
//! component (the feature universe, training/holdout data, per-J
//! statistics, the model, and both optimizers) and is the sole entry
//! point for mutating any of it: [`world::World::run_command`] dispatches
//! every [`command::Command`] this crate recognizes.

#![warn(missing_docs)]

pub mod boundary;
pub mod command;
pub mod config;
pub mod error;
pub mod log;
pub mod world;

pub use boundary::{
    CommandSource, InMemoryModelStore, MapCommandSource, ModelRecord, ModelSink, ModelSource,
    RawRow, RowSource, ScoreSink, ScoredRow, VecRowSource, VecScoreSink,
};
pub use command::{Command, SetOption, SgdSubcommand};
pub use config::{EngineConfig, LearningRateScheduleConfig, LoggingConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use log::{LogRecord, LogSender, LogSink, LogWriter, TracingSink, VecSink};
pub use world::World;

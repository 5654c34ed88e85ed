//! # lrengine
//!
//! A single-machine logistic-regression training engine for sparse
//! boolean-feature data: dense `J`-indexed atomic and product features,
//! a dependees DAG driving automatic row extension, a batch majorizer
//! optimizer and an asynchronous Hogwild SGD optimizer, priority-driven
//! feature exploration and score-ordered pruning, and a command
//! interface tying it all together.
//!
//! # Quick start
//!
//! ```no_run
//! use lrengine::{Command, EngineConfig, RawRow, VecRowSource, World};
//! use lre_core::Label;
//!
//! fn main() -> lrengine::Result<()> {
//!     let mut world = World::new(EngineConfig::default())?;
//!     world.set_row_source(Box::new(VecRowSource::new(vec![
//!         RawRow {
//!             features: vec!["clicked_ad".to_string()],
//!             label: Label::Positive,
//!             row_id: None,
//!             user_id: None,
//!         },
//!     ])));
//!
//!     world.run_command(Command::InitializeBias)?;
//!     world.run_command(Command::ReadData { into_holdout: false })?;
//!     world.run_command(Command::FitModelWeights { iterations: 50 })?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! [`World`] is the aggregate every structural mutation routes through.
//! Collaborators the engine itself does not implement — reading LIBSVM
//! data, writing a model file to disk, emitting a log stream to a file —
//! are boundary traits (`RowSource`, `ModelSink`/`ModelSource`,
//! `ScoreSink`, `CommandSource`, `LogSink`) a caller registers on the
//! `World`; this crate ships only in-memory implementations of each, for
//! tests and for embedding the engine directly in a process.
//!
//! The underlying crates (`lre-core`, `lre-concurrency`, `lre-storage`,
//! `lre-engine`, `lre-explore`) are not re-exported wholesale; only the
//! types a caller needs to drive `World` are re-exported here.

#![warn(missing_docs)]

pub use lre_executor::*;

pub use lre_core::{FeatureName, Label, JProduct, RowId, UserId, J};

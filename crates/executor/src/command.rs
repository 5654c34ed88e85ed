//! Commands accepted by [`World::run_command`](crate::world::World::run_command).
//!
//! Commands are pure data: every field is plain, serializable state, never
//! a boundary object or trait handle. A command that needs an external
//! collaborator (reading rows, writing a model, scoring rows, splicing in
//! a sub-script) dispatches against whatever boundary object is currently
//! registered on the `World`, and fails with a configuration error if none
//! is registered.

use lre_engine::TrainingMode;
use lre_explore::{ExplorationConfig, PruningConfig, ScoreShaping, ScoreStrategy};
use serde::{Deserialize, Serialize};

use crate::config::LearningRateScheduleConfig;
use crate::config::LoggingConfig;
use lre_engine::{RegularizationTerm, Regularizations};

/// A patch over [`crate::config::EngineConfig`]'s fields: every field is
/// optional, and only the ones present are applied. Mirrors the `set`
/// command, which carries only the recognized options the caller
/// chooses to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetOption {
    /// Replace the logging configuration wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    /// Replace the `base` regularization variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regularization: Option<RegularizationTerm>,
    /// Replace the `div_sqrt_n` regularization variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regularization_div_sqrt_n: Option<RegularizationTerm>,
    /// Replace the `mul_sqrt_n` regularization variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regularization_mul_sqrt_n: Option<RegularizationTerm>,
    /// Replace the `confidence` regularization variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regularization_confidence: Option<RegularizationTerm>,
    /// `GradBoost`'s momentum factor. Must be `>= 0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inertia_factor: Option<f64>,
    /// `GradBoost`'s linear-term multiplier. Must be `>= 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_multiplier: Option<f64>,
    /// Whether a regressing total loss reverts `GradBoost`'s update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_undo: Option<bool>,
    /// Run every fork/join pass serially, in a fixed order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deterministic: Option<bool>,
    /// Per-shard non-zero-entry cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shard_size: Option<u32>,
    /// Fraction of scored rows the evaluator computes lift over, in `(0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_lift_fraction: Option<f64>,
    /// SGD's learning-rate schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgd_learning_rate_schedule: Option<LearningRateScheduleConfig>,
}

impl SetOption {
    /// Apply every present field onto `regularizations`, returning the
    /// updated value. Absent fields leave the corresponding variant
    /// untouched.
    pub(crate) fn apply_regularizations(&self, mut regularizations: Regularizations) -> Regularizations {
        if let Some(term) = self.regularization {
            regularizations.base = term;
        }
        if let Some(term) = self.regularization_div_sqrt_n {
            regularizations.div_sqrt_n = term;
        }
        if let Some(term) = self.regularization_mul_sqrt_n {
            regularizations.mul_sqrt_n = term;
        }
        if let Some(term) = self.regularization_confidence {
            regularizations.confidence = term;
        }
        regularizations
    }
}

/// SGD's two learning-rate bookkeeping subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum SgdSubcommand {
    /// Latch the current total loss as the baseline the next
    /// `maybe_reduce` compares against. Callers should run a fresh
    /// full-data loss pass immediately beforehand.
    StoreTotalLoss,
    /// Halve (or otherwise scale by `factor`) the learning rate's start
    /// value if loss has regressed since the last `store_total_loss`.
    MaybeReduce {
        /// Shrink factor, must lie in `(0, 1)`.
        factor: f64,
    },
}

/// Every command `World::run_command` recognizes.
///
/// Commands needing an external collaborator (`read_data`, `store_model`,
/// `write_model`, `get_model`, `score_rows`, `from_file`) dispatch against
/// whatever boundary object is registered on the `World`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Command {
    /// Apply a configuration patch.
    Set(SetOption),
    /// Pull rows from the registered `RowSource` until it is exhausted,
    /// intern their atomic features, extend each row, and append it to
    /// the training set (or the holdout set if `into_holdout`).
    ReadData {
        /// Route rows to the holdout set instead of the training set.
        #[serde(default)]
        into_holdout: bool,
    },
    /// Intern the empty (bias) product feature if not already present.
    InitializeBias,
    /// Run feature exploration for one round.
    AddNewProductFeatures {
        /// Scoring strategy used to rank existing product features.
        strategy: ScoreStrategy,
        /// Score shaping (log transform, bonus features).
        #[serde(default)]
        shaping: ScoreShaping,
        /// Exploration tunables.
        config: ExplorationConfig,
    },
    /// Run feature pruning for one round.
    PruneFeatures {
        /// Scoring strategy used to rank existing features for removal.
        strategy: ScoreStrategy,
        /// Score shaping (log transform, bonus features).
        #[serde(default)]
        shaping: ScoreShaping,
        /// Pruning tunables.
        config: PruningConfig,
    },
    /// Run `iterations` batch `GradBoost` iterations over the training
    /// set (and holdout set, if present).
    FitModelWeights {
        /// Number of iterations to run.
        iterations: u32,
    },
    /// Run `iterations` asynchronous SGD passes over the training set.
    RunSgd {
        /// Number of passes to run.
        iterations: u32,
        /// Which J's each pass updates.
        mode: TrainingMode,
    },
    /// One of SGD's learning-rate bookkeeping subcommands.
    Sgd(SgdSubcommand),
    /// Recompute `Stats` from the current training set.
    EvaluateStats,
    /// Snapshot the current non-zero weights to the registered
    /// `ModelSink`, keeping training state untouched.
    StoreModel,
    /// Write the current non-zero weights to the registered `ModelSink`.
    /// Identical to `StoreModel` at this layer; the distinction between
    /// an in-memory snapshot and a durable disk write is a collaborator
    /// concern (see DESIGN.md).
    WriteModel,
    /// Load weights from the registered `ModelSource`, interning any
    /// feature names not already known and growing the model to match.
    GetModel,
    /// Run `command` `times` times in sequence.
    Repeat {
        /// Repeat count.
        times: u32,
        /// The command to repeat.
        command: Box<Command>,
    },
    /// An engine-internal diagnostic no-op, carrying a free-form tag for
    /// log correlation and used by test scripts to mark checkpoints.
    Internal(String),
    /// Splice in the commands the registered `CommandSource` resolves
    /// `path` to, running them in sequence as if inlined here.
    FromFile(String),
    /// Run every command in `commands`, in sequence.
    CommandList(Vec<Command>),
    /// Score every training row through the registered `ScoreSink`.
    ScoreRows,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_option_round_trips_through_json() {
        let option = SetOption {
            inertia_factor: Some(0.5),
            deterministic: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&option).unwrap();
        let back: SetOption = serde_json::from_str(&json).unwrap();
        assert_eq!(option, back);
    }

    #[test]
    fn apply_regularizations_only_touches_present_fields() {
        let option = SetOption {
            regularization: Some(RegularizationTerm {
                l1: 1.0,
                l2: 0.0,
                l1_at_weight_zero: 0.0,
            }),
            ..Default::default()
        };
        let applied = option.apply_regularizations(Regularizations::default());
        assert_eq!(applied.base.l1, 1.0);
        assert_eq!(applied.div_sqrt_n.l1, 0.0);
    }

    #[test]
    fn command_list_round_trips_through_json() {
        let commands = Command::CommandList(vec![
            Command::InitializeBias,
            Command::FitModelWeights { iterations: 10 },
            Command::Sgd(SgdSubcommand::MaybeReduce { factor: 0.5 }),
        ]);
        let json = serde_json::to_string(&commands).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(commands, back);
    }
}

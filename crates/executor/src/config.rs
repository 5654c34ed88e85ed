//! Engine configuration, loaded from `lrengine.toml`.

use crate::error::{Error, Result};
use lre_engine::{LearningRateSchedule, RegularizationTerm, Regularizations, Schedule};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed alongside the training data.
pub const CONFIG_FILE_NAME: &str = "lrengine.toml";

/// Logging sinks and behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    /// Prefix every log record with a wall-clock timestamp.
    #[serde(default)]
    pub log_timestamp: bool,
    /// Path for the append-only structured-text log stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_log_path: Option<String>,
    /// Path for the append-only serialized-record log stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_log_path: Option<String>,
    /// Truncate both log files on startup instead of appending.
    #[serde(default)]
    pub clear_log_files: bool,
}

/// `sgd_learning_rate_schedule {start_learning_rate, decay_speed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LearningRateScheduleConfig {
    /// Learning rate at `progress == 0`.
    pub start_learning_rate: f64,
    /// Decay strength; `0.0` disables decay.
    pub decay_speed: f64,
}

impl Default for LearningRateScheduleConfig {
    fn default() -> Self {
        Self {
            start_learning_rate: 0.1,
            decay_speed: 0.0,
        }
    }
}

impl LearningRateScheduleConfig {
    /// Resolve into the engine's [`LearningRateSchedule`], given the
    /// training-set size that defines one epoch's worth of progress.
    pub fn resolve(&self, rows_per_epoch: f64) -> LearningRateSchedule {
        LearningRateSchedule {
            start: self.start_learning_rate,
            decay: self.decay_speed,
            rows_per_epoch,
        }
    }
}

fn default_inertia_factor() -> f64 {
    0.0
}

fn default_step_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_max_shard_size() -> u32 {
    1_000_000
}

fn default_logged_lift_fraction() -> f64 {
    0.1
}

fn default_worker_count() -> usize {
    4
}

/// Every training tunable plus the worker-pool sizing that sits
/// alongside them in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Logging sinks and behavior.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Elastic-net regularization (base + 3 variants).
    #[serde(default)]
    pub regularizations: Regularizations,
    /// Momentum factor for `GradBoost`'s coordinate update. Must be `>= 0`.
    #[serde(default = "default_inertia_factor")]
    pub inertia_factor: f64,
    /// Linear-term multiplier for `GradBoost`'s coordinate update. Must be `>= 1`.
    #[serde(default = "default_step_multiplier")]
    pub step_multiplier: f64,
    /// Whether a regressing total loss reverts `GradBoost`'s just-applied update.
    #[serde(default = "default_true")]
    pub allow_undo: bool,
    /// Run every fork/join pass serially, in a fixed order.
    #[serde(default)]
    pub deterministic: bool,
    /// Per-shard non-zero-entry cap.
    #[serde(default = "default_max_shard_size")]
    pub max_shard_size: u32,
    /// Fraction of scored rows the evaluator computes lift over. Must lie in `(0, 1]`.
    #[serde(default = "default_logged_lift_fraction")]
    pub logged_lift_fraction: f64,
    /// SGD's learning-rate schedule.
    #[serde(default)]
    pub sgd_learning_rate_schedule: LearningRateScheduleConfig,
    /// Worker threads for fork/join passes (ignored when `deterministic`).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            regularizations: Regularizations::default(),
            inertia_factor: default_inertia_factor(),
            step_multiplier: default_step_multiplier(),
            allow_undo: default_true(),
            deterministic: false,
            max_shard_size: default_max_shard_size(),
            logged_lift_fraction: default_logged_lift_fraction(),
            sgd_learning_rate_schedule: LearningRateScheduleConfig::default(),
            worker_count: default_worker_count(),
        }
    }
}

impl EngineConfig {
    /// Validate every numeric precondition eagerly, before any command runs.
    pub fn validate(&self) -> Result<()> {
        if self.inertia_factor < 0.0 {
            return Err(Error::Configuration(format!(
                "inertia_factor must be >= 0, got {}",
                self.inertia_factor
            )));
        }
        if self.step_multiplier < 1.0 {
            return Err(Error::Configuration(format!(
                "step_multiplier must be >= 1, got {}",
                self.step_multiplier
            )));
        }
        if !(0.0 < self.logged_lift_fraction && self.logged_lift_fraction <= 1.0) {
            return Err(Error::Configuration(format!(
                "logged_lift_fraction must be in (0, 1], got {}",
                self.logged_lift_fraction
            )));
        }
        if self.max_shard_size == 0 {
            return Err(Error::Configuration(
                "max_shard_size must be > 0".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(Error::Configuration(
                "worker_count must be > 0".to_string(),
            ));
        }
        for (name, term) in [
            ("base", &self.regularizations.base),
            ("div_sqrt_n", &self.regularizations.div_sqrt_n),
            ("mul_sqrt_n", &self.regularizations.mul_sqrt_n),
            ("confidence", &self.regularizations.confidence),
        ] {
            if term.l1 < 0.0 || term.l2 < 0.0 || term.l1_at_weight_zero < 0.0 {
                return Err(Error::Configuration(format!(
                    "regularization variant '{name}' must have non-negative coefficients"
                )));
            }
        }
        Ok(())
    }

    /// The fork/join schedule implied by `worker_count`/`deterministic`.
    pub fn schedule(&self) -> Schedule {
        Schedule {
            worker_count: self.worker_count,
            deterministic: self.deterministic,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# lrengine configuration
#
# Logging: both sinks are optional; omit a path to disable that sink.
[logging]
log_timestamp = false
# text_log_path = "train.log"
# record_log_path = "train.records"
clear_log_files = false

# Elastic-net regularization. Each variant is {l1, l2, l1_at_weight_zero}.
[regularizations.base]
l1 = 0.0
l2 = 0.0
l1_at_weight_zero = 0.0

[regularizations.div_sqrt_n]
l1 = 0.0
l2 = 0.0
l1_at_weight_zero = 0.0

[regularizations.mul_sqrt_n]
l1 = 0.0
l2 = 0.0
l1_at_weight_zero = 0.0

[regularizations.confidence]
l1 = 0.0
l2 = 0.0
l1_at_weight_zero = 0.0

# GradBoost coordinate update tunables.
inertia_factor = 0.0
step_multiplier = 1.0
allow_undo = true

# Run every fork/join pass serially, in a fixed order (slower, reproducible).
deterministic = false

# Per-shard non-zero-entry cap.
max_shard_size = 1000000

# Fraction of scored rows the evaluator computes lift over, in (0, 1].
logged_lift_fraction = 0.1

[sgd_learning_rate_schedule]
start_learning_rate = 0.1
decay_speed = 0.0

worker_count = 4
"#
    }

    /// Read and parse config from a file path, validating eagerly.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("failed to read config '{}': {e}", path.display())))?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| Error::Configuration(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())
                .map_err(|e| Error::Io(format!("failed to write config '{}': {e}", path.display())))?;
        }
        Ok(())
    }
}

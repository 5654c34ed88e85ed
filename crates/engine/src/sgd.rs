//! Asynchronous Hogwild SGD: every worker walks its own shard chunk and
//! applies gradient updates straight to the shared [`Model`] with no
//! per-row locking, trading a small amount of staleness for throughput.

use crate::error::{Error, Result};
use crate::model::Model;
use crate::regularization::Regularizations;
use crate::worker_pool::Schedule;
use lre_core::{Label, J};
use lre_storage::ShardSet;

/// Which J's an SGD pass is allowed to update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingMode {
    /// Every J in the model.
    AllFeatures,
    /// Only J's stamped with the model's current (most recent) creation
    /// round — the batch just added by feature exploration.
    NewFeatures,
}

/// Learning-rate schedule: `eta(t) = start / (1 + decay * progress)`,
/// where `progress` is rows processed so far divided by `rows_per_epoch`.
#[derive(Debug, Clone, Copy)]
pub struct LearningRateSchedule {
    /// Learning rate at `progress == 0`.
    pub start: f64,
    /// Decay strength; `0.0` disables decay.
    pub decay: f64,
    /// Rows defining one unit of `progress`.
    pub rows_per_epoch: f64,
}

impl LearningRateSchedule {
    fn rate_at(&self, rows_processed: u64) -> f64 {
        let progress = if self.rows_per_epoch > 0.0 {
            rows_processed as f64 / self.rows_per_epoch
        } else {
            0.0
        };
        self.start / (1.0 + self.decay * progress)
    }
}

/// Tunables for one [`Sgd`] instance.
#[derive(Debug, Clone, Copy)]
pub struct SgdConfig {
    /// Fork/join scheduling across shards.
    pub schedule: Schedule,
    /// The learning-rate schedule.
    pub learning_rate: LearningRateSchedule,
    /// Which J's this pass updates.
    pub mode: TrainingMode,
}

/// One pass's report, suitable for the `sgd` log record.
#[derive(Debug, Clone, Copy)]
pub struct SgdPassLog {
    /// Rows processed this pass.
    pub rows_processed: u64,
    /// Learning rate in effect at the end of the pass.
    pub ending_learning_rate: f64,
}

/// The asynchronous Hogwild SGD optimizer.
///
/// Regularization for SGD is restricted to the `base` variant
/// ([`Regularizations::is_standard`]): `div_sqrt_n`/`mul_sqrt_n`/
/// `confidence` all depend on `rows_with_j` or the majorizer's `a`, neither
/// of which SGD recomputes per row, so only the row-independent `base`
/// coefficients are accepted.
pub struct Sgd {
    config: SgdConfig,
    rows_processed: u64,
    prev_total_loss: f64,
}

impl Sgd {
    /// A fresh SGD optimizer. Returns an error if `regularizations` uses a
    /// non-`base` variant.
    pub fn new(config: SgdConfig, regularizations: &Regularizations) -> Result<Self> {
        if !regularizations.is_standard() {
            return Err(Error::NonStandardRegularizationForSgd);
        }
        Ok(Self {
            config,
            rows_processed: 0,
            prev_total_loss: f64::INFINITY,
        })
    }

    /// Total rows processed across every `run_pass` call so far.
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    /// Update the learning-rate schedule's epoch size — called when the
    /// training set grows (e.g. after `read_data`).
    pub fn set_rows_per_epoch(&mut self, rows_per_epoch: f64) {
        self.config.learning_rate.rows_per_epoch = rows_per_epoch;
    }

    /// The schedule's current `start_learning_rate`, reflecting any prior
    /// `maybe_reduce` shrinkage.
    pub fn learning_rate_start(&self) -> f64 {
        self.config.learning_rate.start
    }

    /// Replace the fork/join schedule and training mode, e.g. after a
    /// `set` command changes `deterministic`/worker sizing, or a new
    /// `run_sgd` call picks a different [`TrainingMode`].
    pub fn configure(&mut self, schedule: Schedule, mode: TrainingMode) {
        self.config.schedule = schedule;
        self.config.mode = mode;
    }

    /// Replace the learning-rate schedule wholesale, e.g. after a `set
    /// sgd_learning_rate_schedule` command.
    pub fn set_learning_rate(&mut self, learning_rate: LearningRateSchedule) {
        self.config.learning_rate = learning_rate;
    }

    /// One asynchronous pass over `shards`: each worker thread walks its
    /// chunk of shards independently, computing `wx` from the live model
    /// (possibly stale, racing with other workers) and applying a gradient
    /// step plus proximal L1/L2 regularization directly to `model` via
    /// [`Model::atomic_add`].
    pub fn run_pass(
        &mut self,
        model: &Model,
        shards: &ShardSet,
        regularizations: &Regularizations,
    ) -> SgdPassLog {
        let learning_rate = self.config.learning_rate.rate_at(self.rows_processed);
        let mode = self.config.mode;
        let rows_processed: u64 = self
            .config
            .schedule
            .fork_join(shards.shards(), |chunk| {
                let mut rows = 0u64;
                for shard in chunk {
                    let mut touched = std::collections::HashSet::new();
                    for (_, row, label, _, _) in shard.iter() {
                        let wx: f64 = row.iter().map(|&j| model.get(j)).sum();
                        let y = label.signed();
                        let sigma = 1.0 / (1.0 + (y * wx).exp());
                        let gradient_step = learning_rate * y * sigma;
                        for &j in row {
                            if !Self::should_update_for(mode, model, j) {
                                continue;
                            }
                            model.atomic_add(j, gradient_step);
                            touched.insert(j);
                        }
                        rows += 1;
                    }
                    // One regularization pass per J per shard, not per
                    // (row, occurrence) — otherwise a J present in N rows
                    // of the shard would shrink N times in one pass.
                    for j in touched {
                        Self::apply_proximal_regularization(
                            model,
                            j,
                            learning_rate,
                            regularizations,
                        );
                    }
                }
                rows
            })
            .into_iter()
            .sum();

        self.rows_processed += rows_processed;
        tracing::debug!(rows_processed, learning_rate, "sgd pass complete");
        SgdPassLog {
            rows_processed,
            ending_learning_rate: learning_rate,
        }
    }

    fn should_update_for(mode: TrainingMode, model: &Model, j: J) -> bool {
        match mode {
            TrainingMode::AllFeatures => true,
            TrainingMode::NewFeatures => {
                model.creation_time(j) == model.current_creation_time()
            }
        }
    }

    /// Proximal L1/L2 step: `w -= eta * (l2_coef * 2 * w)` shrinks toward
    /// zero continuously, then the L1 coefficient clips the weight to
    /// exactly zero if the step would cross it (soft-thresholding).
    fn apply_proximal_regularization(
        model: &Model,
        j: J,
        learning_rate: f64,
        regularizations: &Regularizations,
    ) {
        let base = regularizations.base;
        if base.l1 == 0.0 && base.l2 == 0.0 {
            return;
        }
        let w0 = model.get(j);
        let shrunk = w0 - learning_rate * 2.0 * base.l2 * w0;
        let threshold = learning_rate * base.l1;
        let new_w = if shrunk > threshold {
            shrunk - threshold
        } else if shrunk < -threshold {
            shrunk + threshold
        } else {
            0.0
        };
        model.atomic_add(j, new_w - w0);
    }

    /// Latch the current total loss as the baseline `maybe_reduce`
    /// compares against. Callers are expected to have just run a full
    /// loss-computation pass over the whole training set; this command
    /// only records the number handed to it.
    pub fn store_total_loss(&mut self, total_loss: f64) {
        self.prev_total_loss = total_loss;
    }

    /// If `current_total_loss` exceeds the loss latched by
    /// [`Sgd::store_total_loss`], multiply the learning rate's `start` by
    /// `factor`. `factor` must lie in `(0, 1)`.
    ///
    /// Note: this compares `current_total_loss` against whatever was last
    /// latched by `store_total_loss`, so calling `maybe_reduce` more than
    /// once per `store_total_loss` call compares against a stale baseline
    /// that never advances — callers driving a reduce-on-plateau loop must
    /// re-latch before each `maybe_reduce` or the factor will keep
    /// triggering on the same stale comparison.
    pub fn maybe_reduce(&mut self, current_total_loss: f64, factor: f64) -> Result<bool> {
        if !(0.0 < factor && factor < 1.0) {
            return Err(Error::InvalidReduceFactor(factor));
        }
        if current_total_loss > self.prev_total_loss {
            self.config.learning_rate.start *= factor;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regularization::RegularizationTerm;

    fn toy_shards(n: u32) -> ShardSet {
        let mut shards = ShardSet::new(1000);
        for i in 0..n {
            let label = if i % 2 == 0 {
                Label::Positive
            } else {
                Label::Negative
            };
            shards.append_row(&[0], label, i, None).unwrap();
        }
        shards
    }

    fn default_config() -> SgdConfig {
        SgdConfig {
            schedule: Schedule {
                worker_count: 2,
                deterministic: true,
            },
            learning_rate: LearningRateSchedule {
                start: 0.1,
                decay: 0.0,
                rows_per_epoch: 100.0,
            },
            mode: TrainingMode::AllFeatures,
        }
    }

    #[test]
    fn rejects_non_standard_regularization() {
        let regularizations = Regularizations {
            div_sqrt_n: RegularizationTerm {
                l1: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = Sgd::new(default_config(), &regularizations);
        assert!(matches!(result, Err(Error::NonStandardRegularizationForSgd)));
    }

    #[test]
    fn run_pass_counts_every_row_and_advances_progress() {
        let model = Model::new(1);
        let shards = toy_shards(10);
        let regularizations = Regularizations::default();
        let mut sgd = Sgd::new(default_config(), &regularizations).unwrap();

        let log = sgd.run_pass(&model, &shards, &regularizations);
        assert_eq!(log.rows_processed, 10);
        assert_eq!(sgd.rows_processed(), 10);
    }

    #[test]
    fn new_features_mode_skips_js_from_earlier_rounds() {
        let mut model = Model::new(1);
        model.grow(2);
        let mut shards = ShardSet::new(1000);
        shards.append_row(&[0, 1], Label::Positive, 0, None).unwrap();
        let regularizations = Regularizations::default();
        let mut config = default_config();
        config.mode = TrainingMode::NewFeatures;
        let mut sgd = Sgd::new(config, &regularizations).unwrap();

        sgd.run_pass(&model, &shards, &regularizations);
        assert_eq!(model.get(0), 0.0);
        assert_ne!(model.get(1), 0.0);
    }

    #[test]
    fn maybe_reduce_shrinks_start_rate_when_loss_regresses() {
        let regularizations = Regularizations::default();
        let mut sgd = Sgd::new(default_config(), &regularizations).unwrap();
        sgd.store_total_loss(1.0);
        let reduced = sgd.maybe_reduce(2.0, 0.5).unwrap();
        assert!(reduced);
        assert!((sgd.config.learning_rate.start - 0.05).abs() < 1e-12);
    }

    #[test]
    fn maybe_reduce_rejects_out_of_range_factor() {
        let regularizations = Regularizations::default();
        let mut sgd = Sgd::new(default_config(), &regularizations).unwrap();
        sgd.store_total_loss(1.0);
        let result = sgd.maybe_reduce(2.0, 1.5);
        assert!(matches!(result, Err(Error::InvalidReduceFactor(_))));
    }
}

//! The batch majorizer optimizer: one training pass computes a quadratic
//! upper bound on the logistic loss, then applies a coordinate update.

use crate::evaluator::{EvaluationMetrics, Evaluator};
use crate::majorizer::{stable_log_loss, Majorizer, UpdateParams};
use crate::model::Model;
use crate::pool::MajorizerPool;
use crate::regularization::Regularizations;
use crate::worker_pool::Schedule;
use lre_core::Label;
use lre_storage::{ShardSet, Stats};

/// Tunables for one [`GradBoost`] instance.
#[derive(Debug, Clone, Copy)]
pub struct GradBoostConfig {
    /// Fork/join scheduling for row and majorizer-fold passes.
    pub schedule: Schedule,
    /// Momentum factor for the coordinate update.
    pub inertia_factor: f64,
    /// Linear-term multiplier for the coordinate update (>= 1).
    pub step_multiplier: f64,
    /// Whether a regressing total loss reverts the just-applied update.
    pub allow_undo: bool,
}

impl Default for GradBoostConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            inertia_factor: 0.0,
            step_multiplier: 1.0,
            allow_undo: true,
        }
    }
}

/// One iteration's report, suitable for the `iteration` log record.
#[derive(Debug, Clone)]
pub struct IterationLog {
    /// Training rows processed.
    pub training_rows: u64,
    /// Holdout rows processed, if a holdout shard set was supplied.
    pub holdout_rows: Option<u64>,
    /// Total loss (log loss + regularization loss) before this
    /// iteration's update was applied.
    pub total_loss: f64,
    /// Log loss component of `total_loss`.
    pub log_loss: f64,
    /// Regularization loss component of `total_loss`.
    pub regularization_loss: f64,
    /// Holdout log loss, if a holdout shard set was supplied.
    pub holdout_log_loss: Option<f64>,
    /// Sum of absolute weights after the update.
    pub weight_l1: f64,
    /// Sum of squared weights after the update.
    pub weight_l2: f64,
    /// Count of non-zero weights after the update.
    pub nonzero_weights: usize,
    /// `true` if the inertia restart rule fired this iteration.
    pub reverted_by_inertia: bool,
    /// `true` if the undo rule reverted this iteration's update.
    pub reverted_by_undo: bool,
    /// Evaluator metrics over the training pass, if an evaluator was given.
    pub training_metrics: Option<EvaluationMetrics>,
}

/// The batch majorizer optimizer.
pub struct GradBoost {
    config: GradBoostConfig,
    prev_delta_w: Vec<f64>,
    prev_total_loss: f64,
}

struct PassResult {
    majorizer: Majorizer,
    log_loss: f64,
    scored: Vec<(f64, Label)>,
}

impl GradBoost {
    /// A fresh optimizer for a model with `j_size` J's.
    pub fn new(config: GradBoostConfig, j_size: u32) -> Self {
        Self {
            config,
            prev_delta_w: vec![0.0; j_size as usize],
            prev_total_loss: f64::INFINITY,
        }
    }

    /// Grow internal per-J state (the previous delta, used by inertia)
    /// to match a larger model after feature exploration.
    pub fn grow(&mut self, new_size: u32) {
        self.prev_delta_w.resize(new_size as usize, 0.0);
    }

    /// Replace the coordinate-update tunables (inertia/step/undo/schedule),
    /// e.g. after a `set` command changes them mid-run.
    pub fn set_config(&mut self, config: GradBoostConfig) {
        self.config = config;
    }

    /// Shrink/renumber internal per-J state after pruning.
    pub fn remove_and_renumber(&mut self, renumbering: &lre_concurrency::Renumbering) {
        let mut new_delta = vec![0.0; renumbering.new_size() as usize];
        for (old_j, new_j) in renumbering.survivors() {
            if (old_j as usize) < self.prev_delta_w.len() {
                new_delta[new_j as usize] = self.prev_delta_w[old_j as usize];
            }
        }
        self.prev_delta_w = new_delta;
    }

    fn full_pass(&self, model: &Model, shards: &ShardSet, pool: &MajorizerPool) -> PassResult {
        let chunk_results: Vec<(Majorizer, f64, Vec<(f64, Label)>)> =
            self.config.schedule.fork_join(shards.shards(), |chunk| {
                let mut guard = pool.acquire();
                let mut log_loss = 0.0;
                let mut scored = Vec::new();
                for shard in chunk {
                    for (_, row, label, _, _) in shard.iter() {
                        let wx: f64 = row.iter().map(|&j| model.get(j)).sum();
                        log_loss += stable_log_loss(wx * label.signed());
                        scored.push((wx, label));
                        guard.accumulate_row(row, wx, label);
                    }
                }
                // Clone the accumulated terms out before the pooled guard
                // is cleared and released back to the pool on drop.
                let majorizer = guard.clone();
                (majorizer, log_loss, scored)
            });

        let mut majorizer = Majorizer::new(model.len());
        let mut total_log_loss = 0.0;
        let mut scored = Vec::new();
        for (chunk_majorizer, log_loss, rows_scored) in chunk_results {
            majorizer.fold_into(&chunk_majorizer);
            total_log_loss += log_loss;
            scored.extend(rows_scored);
        }

        PassResult {
            majorizer,
            log_loss: total_log_loss,
            scored,
        }
    }

    fn regularization_loss(
        &self,
        model: &Model,
        regularizations: &Regularizations,
        stats: &Stats,
    ) -> f64 {
        (0..model.len())
            .map(|j| {
                regularizations.loss_term(stats.rows_with_j(j), 0.0, model.get(j))
            })
            .sum()
    }

    fn holdout_log_loss(&self, model: &Model, holdout: &ShardSet) -> f64 {
        self.config
            .schedule
            .fork_join(holdout.shards(), |chunk| {
                let mut loss = 0.0;
                for shard in chunk {
                    for (_, row, label, _, _) in shard.iter() {
                        let wx: f64 = row.iter().map(|&j| model.get(j)).sum();
                        loss += stable_log_loss(wx * label.signed());
                    }
                }
                loss
            })
            .into_iter()
            .sum()
    }

    /// Compute total loss (log loss + regularization loss) at the current
    /// `w` without applying a coordinate update, for SGD's
    /// `store_total_loss`/`maybe_reduce` subcommands, which need a fresh
    /// full-data loss figure without disturbing the batch optimizer's own
    /// inertia/undo state.
    pub fn total_loss(
        &self,
        model: &Model,
        training: &ShardSet,
        stats: &Stats,
        regularizations: &Regularizations,
        pool: &MajorizerPool,
    ) -> f64 {
        let pass = self.full_pass(model, training, pool);
        pass.log_loss + self.regularization_loss(model, regularizations, stats)
    }

    /// Run one full training pass: rebuild the majorizer, compute total
    /// loss, apply the coordinate update, and report an [`IterationLog`].
    pub fn run_iteration(
        &mut self,
        model: &Model,
        training: &ShardSet,
        holdout: Option<&ShardSet>,
        stats: &Stats,
        regularizations: &Regularizations,
        pool: &MajorizerPool,
        evaluator: Option<&dyn Evaluator>,
    ) -> IterationLog {
        let pass = self.full_pass(model, training, pool);
        let regularization_loss = self.regularization_loss(model, regularizations, stats);
        let total_loss = pass.log_loss + regularization_loss;

        let update_result = pass.majorizer.coordinate_update(
            model,
            regularizations,
            stats,
            &self.prev_delta_w,
            UpdateParams {
                inertia_factor: self.config.inertia_factor,
                step_multiplier: self.config.step_multiplier,
            },
        );

        let mut reverted_by_undo = false;
        if !update_result.reverted_by_inertia
            && self.config.allow_undo
            && total_loss > self.prev_total_loss
        {
            Majorizer::undo(model, &update_result.delta_w);
            self.prev_delta_w = vec![0.0; update_result.delta_w.len()];
            self.prev_total_loss = f64::INFINITY;
            reverted_by_undo = true;
        } else {
            self.prev_delta_w = update_result.delta_w;
            self.prev_total_loss = total_loss;
        }

        let holdout_log_loss = holdout.map(|h| self.holdout_log_loss(model, h));
        let training_metrics = evaluator.map(|e| e.evaluate(&pass.scored));

        tracing::info!(
            total_loss,
            reverted_by_inertia = update_result.reverted_by_inertia,
            reverted_by_undo,
            "gradboost iteration complete"
        );

        IterationLog {
            training_rows: training.row_count(),
            holdout_rows: holdout.map(|h| h.row_count()),
            total_loss,
            log_loss: pass.log_loss,
            regularization_loss,
            holdout_log_loss,
            weight_l1: model.l1_norm(),
            weight_l2: model.l2_norm(),
            nonzero_weights: model.nonzero_count(),
            reverted_by_inertia: update_result.reverted_by_inertia,
            reverted_by_undo,
            training_metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lre_core::Label;

    fn toy_shards() -> ShardSet {
        let mut shards = ShardSet::new(1000);
        for i in 0..20u32 {
            let label = if i % 2 == 0 {
                Label::Positive
            } else {
                Label::Negative
            };
            shards.append_row(&[0], label, i, None).unwrap();
        }
        shards
    }

    #[test]
    fn run_iteration_reduces_total_loss_on_a_separable_toy_problem() {
        let model = Model::new(1);
        let shards = toy_shards();
        let stats = lre_storage::recalc_stats(&shards, 1, 2);
        let regularizations = Regularizations::default();
        let pool = MajorizerPool::new(2, 1);
        let mut optimizer = GradBoost::new(GradBoostConfig::default(), 1);

        let first = optimizer.run_iteration(
            &model, &shards, None, &stats, &regularizations, &pool, None,
        );
        let second = optimizer.run_iteration(
            &model, &shards, None, &stats, &regularizations, &pool, None,
        );
        assert!(second.total_loss <= first.total_loss + 1e-6);
    }

    #[test]
    fn grow_extends_prev_delta_w() {
        let mut optimizer = GradBoost::new(GradBoostConfig::default(), 2);
        optimizer.grow(5);
        assert_eq!(optimizer.prev_delta_w.len(), 5);
    }
}

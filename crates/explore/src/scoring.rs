//! Feature scoring strategies shared by exploration and pruning:
//! `|w|`, `|w|·row_count`, mutual information, phi coefficient; optional
//! additive log-transform and multiplicative bonus for a configured
//! feature set.

use lre_core::J;
use lre_engine::Model;
use lre_storage::Stats;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Which base statistic to rank J's by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreStrategy {
    /// `|w_j|`.
    AbsWeight,
    /// `|w_j| * rows_with_j`.
    AbsWeightTimesRowCount,
    /// Mutual information between J's presence and the label.
    MutualInformation,
    /// The phi coefficient (binary Pearson correlation), taken in
    /// absolute value so negative and positive correlation score equally.
    PhiCoefficient,
}

/// Optional score post-processing applied after the base statistic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreShaping {
    /// Apply `ln(1 + score)` after the base statistic.
    pub log_transform: bool,
    /// J's in this set have their score multiplied by `bonus_factor`.
    pub bonus_features: FxHashSet<J>,
    /// Multiplier applied to `bonus_features` members.
    pub bonus_factor: f64,
}

impl ScoreShaping {
    /// No shaping: the base statistic is used unmodified.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Compute `score[j]` for every `j` in `0..j_size` under `strategy`, then
/// `shaping`.
pub fn compute_scores(
    model: &Model,
    stats: &Stats,
    j_size: u32,
    strategy: ScoreStrategy,
    shaping: &ScoreShaping,
) -> Vec<f64> {
    (0..j_size)
        .map(|j| {
            let base = match strategy {
                ScoreStrategy::AbsWeight => model.get(j).abs(),
                ScoreStrategy::AbsWeightTimesRowCount => {
                    model.get(j).abs() * stats.rows_with_j(j) as f64
                }
                ScoreStrategy::MutualInformation => stats.mutual_information(j),
                ScoreStrategy::PhiCoefficient => stats.phi_coefficient(j).abs(),
            };
            let mut score = if shaping.log_transform {
                base.max(0.0).ln_1p()
            } else {
                base
            };
            if shaping.bonus_features.contains(&j) {
                score *= shaping.bonus_factor;
            }
            score
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lre_core::Label;

    #[test]
    fn abs_weight_strategy_matches_model_weights() {
        let model = Model::new(2);
        model.set(0, -3.0);
        model.set(1, 1.5);
        let stats = Stats::new(2);
        let scores = compute_scores(&model, &stats, 2, ScoreStrategy::AbsWeight, &ScoreShaping::none());
        assert_eq!(scores, vec![3.0, 1.5]);
    }

    #[test]
    fn row_count_strategy_scales_by_occurrence() {
        let model = Model::new(1);
        model.set(0, 2.0);
        let mut stats = Stats::new(1);
        for i in 0..4u32 {
            stats.record_row(&[0], Label::Positive, i);
        }
        let scores = compute_scores(
            &model,
            &stats,
            1,
            ScoreStrategy::AbsWeightTimesRowCount,
            &ScoreShaping::none(),
        );
        assert_eq!(scores[0], 8.0);
    }

    #[test]
    fn bonus_features_multiply_their_score() {
        let model = Model::new(2);
        model.set(0, 1.0);
        model.set(1, 1.0);
        let stats = Stats::new(2);
        let mut bonus_features = FxHashSet::default();
        bonus_features.insert(1u32);
        let shaping = ScoreShaping {
            log_transform: false,
            bonus_features,
            bonus_factor: 10.0,
        };
        let scores = compute_scores(&model, &stats, 2, ScoreStrategy::AbsWeight, &shaping);
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 10.0);
    }

    #[test]
    fn log_transform_compresses_large_scores() {
        let model = Model::new(1);
        model.set(0, 100.0);
        let stats = Stats::new(1);
        let shaping = ScoreShaping {
            log_transform: true,
            ..ScoreShaping::none()
        };
        let scores = compute_scores(&model, &stats, 1, ScoreStrategy::AbsWeight, &shaping);
        assert!(scores[0] < 100.0);
        assert!((scores[0] - 101f64.ln()).abs() < 1e-9);
    }
}

//! The evaluator boundary: GradBoost's iteration log optionally reports
//! AUC and lift, computed by a collaborator outside this crate's scope.

use lre_core::Label;

/// AUC and lift-at-configured-fraction for one scored pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    /// Area under the ROC curve.
    pub auc: f64,
    /// Lift at the evaluator's configured fraction.
    pub lift: f64,
}

/// Scores a `(score, label)` stream into [`EvaluationMetrics`]. Concrete
/// AUC/lift computation (rank sorting, threshold sweeps) is a
/// collaborator's responsibility; GradBoost only needs this boundary.
pub trait Evaluator: Send + Sync {
    /// Compute metrics over one pass's `(score, label)` pairs.
    fn evaluate(&self, scored_rows: &[(f64, Label)]) -> EvaluationMetrics;
}

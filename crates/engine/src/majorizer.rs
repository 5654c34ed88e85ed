//! The Jaakkola-Jordan quadratic majorizer for logistic loss, and the
//! per-iteration coordinate update built on top of it.

use crate::model::Model;
use crate::regularization::Regularizations;
use lre_core::{Label, J};
use lre_storage::Stats;

/// Per-J accumulator of the majorant's quadratic (`a`) and linear (`b`)
/// coefficients, summed over every row that contains the J.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dim1Majorizer {
    /// Sum of per-row quadratic coefficients.
    pub a: f64,
    /// Sum of per-row linear coefficients.
    pub b: f64,
}

/// The per-coordinate quadratic upper bound of the logistic loss at the
/// current weight, one [`Dim1Majorizer`] per J.
#[derive(Debug, Clone, PartialEq)]
pub struct Majorizer {
    terms: Vec<Dim1Majorizer>,
}

/// `A = (e^x - 1) / ((e^x + 1) * x)`, the Jaakkola-Jordan bound
/// coefficient, with `0.5` as the stable limit as `x -> 0`.
fn jaakkola_jordan_a(wxy: f64) -> f64 {
    if wxy.abs() < 1e-8 {
        return 0.5;
    }
    let exp = wxy.exp();
    (exp - 1.0) / ((exp + 1.0) * wxy)
}

/// Numerically stable `log(1 + exp(-wxy))`.
pub fn stable_log_loss(wxy: f64) -> f64 {
    if wxy > 0.0 {
        (-wxy).exp().ln_1p()
    } else {
        -wxy + wxy.exp().ln_1p()
    }
}

impl Majorizer {
    /// An all-zero majorizer sized for `j_size` J's.
    pub fn new(j_size: u32) -> Self {
        Self {
            terms: vec![Dim1Majorizer::default(); j_size as usize],
        }
    }

    /// Reset every term to zero, keeping the allocation (reused by
    /// [`crate::pool::MajorizerPool`]).
    pub fn clear(&mut self) {
        for term in &mut self.terms {
            *term = Dim1Majorizer::default();
        }
    }

    /// Number of J's this majorizer covers.
    pub fn len(&self) -> u32 {
        self.terms.len() as u32
    }

    /// `true` if this majorizer covers no J's.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The accumulated term for one J.
    pub fn term(&self, j: J) -> Dim1Majorizer {
        self.terms[j as usize]
    }

    /// Fold one row's contribution: `row` is the extended (transitive
    /// closure) feature set, `wx` is `w . x` for the row, `y` the label.
    pub fn accumulate_row(&mut self, row: &[J], wx: f64, y: Label) {
        let y_signed = y.signed();
        let wxy = wx * y_signed;
        let a = jaakkola_jordan_a(wxy);
        let b = (a * wx * y_signed - 1.0) * y_signed;
        for &j in row {
            let term = &mut self.terms[j as usize];
            term.a += a;
            term.b += b;
        }
    }

    /// Fold another (thread-local) majorizer's terms into this one,
    /// summing `a` and `b` per J — the range-split fold step used after
    /// parallel row passes.
    pub fn fold_into(&mut self, other: &Majorizer) {
        debug_assert_eq!(self.terms.len(), other.terms.len());
        for (mine, theirs) in self.terms.iter_mut().zip(other.terms.iter()) {
            mine.a += theirs.a;
            mine.b += theirs.b;
        }
    }

    /// Precision for one J: `a/2 + 2*L2`.
    pub fn precision(&self, j: J, regularizations: &Regularizations, stats: &Stats) -> f64 {
        let term = self.term(j);
        let eff = regularizations.effective(stats.rows_with_j(j), term.a, false);
        term.a / 2.0 + 2.0 * eff.l2
    }
}

/// Tunables for [`Majorizer::coordinate_update`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateParams {
    /// Momentum factor applied to the previous iteration's `delta_w`.
    pub inertia_factor: f64,
    /// Multiplier on the majorant's linear term (`>= 1`).
    pub step_multiplier: f64,
}

/// The outcome of one coordinate-update pass.
#[derive(Debug, Clone)]
pub struct CoordinateUpdateResult {
    /// Per-J weight change applied this iteration (zeroed if reverted).
    pub delta_w: Vec<f64>,
    /// `true` if the inertia restart rule fired and the step was undone.
    pub reverted_by_inertia: bool,
}

impl Majorizer {
    /// One coordinate-descent pass: computes and applies `delta_w` to
    /// `weights` in place, honoring the inertia restart rule.
    pub fn coordinate_update(
        &self,
        weights: &Model,
        regularizations: &Regularizations,
        stats: &Stats,
        prev_delta_w: &[f64],
        params: UpdateParams,
    ) -> CoordinateUpdateResult {
        let j_size = self.terms.len();
        let mut delta_w = vec![0.0; j_size];
        let mut gradient_dot_delta = 0.0;

        for j in 0..j_size {
            let term = self.terms[j];
            let w0 = weights.get(j as J);
            let rows_with_j = stats.rows_with_j(j as J);
            let eff = regularizations.effective(rows_with_j, term.a, w0 == 0.0);

            let a_big = term.a + 4.0 * eff.l2;
            let prev_delta = prev_delta_w.get(j).copied().unwrap_or(0.0);
            let mut b_big = term.a * w0 - params.step_multiplier * term.b
                + params.inertia_factor * prev_delta * a_big;

            let shrink = 2.0 * eff.l1;
            b_big = b_big.signum() * (b_big.abs() - shrink).max(0.0);

            let w_new = if a_big == 0.0 { 0.0 } else { b_big / a_big };
            let dw = w_new - w0;
            delta_w[j] = dw;
            // term.b is +2*grad(loss) at w0 per J, so this is grad.dot(delta_w).
            gradient_dot_delta += term.b * dw;
        }

        let reverted = gradient_dot_delta > 0.0;
        if reverted {
            for d in delta_w.iter_mut() {
                *d = 0.0;
            }
        } else {
            for (j, &dw) in delta_w.iter().enumerate() {
                if dw != 0.0 {
                    let w0 = weights.get(j as J);
                    weights.set(j as J, w0 + dw);
                }
            }
        }

        CoordinateUpdateResult {
            delta_w,
            reverted_by_inertia: reverted,
        }
    }

    /// Undo rule: subtract `delta_w` back out of `weights` (the previous
    /// iteration's step is reverted because total loss regressed).
    pub fn undo(weights: &Model, delta_w: &[f64]) {
        for (j, &dw) in delta_w.iter().enumerate() {
            if dw != 0.0 {
                let w0 = weights.get(j as J);
                weights.set(j as J, w0 - dw);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaakkola_jordan_limit_at_zero_is_half() {
        assert!((jaakkola_jordan_a(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn stable_log_loss_matches_naive_away_from_extremes() {
        let wxy = 1.3;
        let naive = (1.0 + (-wxy).exp()).ln();
        assert!((stable_log_loss(wxy) - naive).abs() < 1e-9);
    }

    #[test]
    fn accumulate_row_only_touches_js_in_the_row() {
        let mut majorizer = Majorizer::new(3);
        majorizer.accumulate_row(&[0, 2], 0.5, Label::Positive);
        assert_ne!(majorizer.term(0), Dim1Majorizer::default());
        assert_eq!(majorizer.term(1), Dim1Majorizer::default());
        assert_ne!(majorizer.term(2), Dim1Majorizer::default());
    }

    #[test]
    fn fold_into_sums_terms() {
        let mut a = Majorizer::new(1);
        a.accumulate_row(&[0], 0.1, Label::Positive);
        let mut b = Majorizer::new(1);
        b.accumulate_row(&[0], 0.2, Label::Negative);

        let expected_a = a.term(0).a + b.term(0).a;
        a.fold_into(&b);
        assert!((a.term(0).a - expected_a).abs() < 1e-12);
    }

    #[test]
    fn coordinate_update_moves_weight_toward_lower_loss() {
        let model = Model::new(1);
        let mut majorizer = Majorizer::new(1);
        for _ in 0..20 {
            majorizer.accumulate_row(&[0], 0.0, Label::Positive);
        }
        let stats = Stats::new(1);
        let regularizations = Regularizations::default();
        let result = majorizer.coordinate_update(
            &model,
            &regularizations,
            &stats,
            &[0.0],
            UpdateParams {
                inertia_factor: 0.0,
                step_multiplier: 1.0,
            },
        );
        assert!(!result.reverted_by_inertia);
        assert!(model.get(0) > 0.0);
    }

    #[test]
    fn undo_reverts_exactly_the_prior_delta() {
        let model = Model::new(1);
        model.set(0, 1.0);
        let delta_w = vec![0.4];
        for (j, &dw) in delta_w.iter().enumerate() {
            model.set(j as J, model.get(j as J) + dw);
        }
        Majorizer::undo(&model, &delta_w);
        assert!((model.get(0) - 1.0).abs() < 1e-12);
    }
}

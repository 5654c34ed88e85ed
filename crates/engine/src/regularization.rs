//! Composite elastic-net regularization: four contributions summed per J.

use serde::{Deserialize, Serialize};

/// A small floor added under a square root to avoid dividing by zero.
const CONFIDENCE_EPSILON: f64 = 1e-6;

/// One `(l1, l2, l1_at_weight_zero)` triple, the shape shared by all four
/// regularization variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegularizationTerm {
    /// L1 coefficient.
    pub l1: f64,
    /// L2 coefficient.
    pub l2: f64,
    /// Extra L1 coefficient applied only while the current weight is
    /// exactly zero, to widen the dead-zone and keep zero weights stuck.
    pub l1_at_weight_zero: f64,
}

impl RegularizationTerm {
    /// `true` if every field is zero.
    pub fn is_zero(&self) -> bool {
        self.l1 == 0.0 && self.l2 == 0.0 && self.l1_at_weight_zero == 0.0
    }
}

/// The four composite regularization contributions. Effective per-J `L1`
/// and `L2` are the sum of all four, each scaled by its own rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Regularizations {
    /// Applied unconditionally.
    pub base: RegularizationTerm,
    /// Divided by `sqrt(rows_with_j + 1)`.
    pub div_sqrt_n: RegularizationTerm,
    /// Multiplied by `sqrt(rows_with_j + 1)`.
    pub mul_sqrt_n: RegularizationTerm,
    /// Divided by `sqrt(majorizer_a) + epsilon`.
    pub confidence: RegularizationTerm,
}

/// Effective `(l1, l2)` for one J, folding all four contributions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveRegularization {
    /// Effective L1 coefficient, including the weight-zero widening term.
    pub l1: f64,
    /// Effective L2 coefficient.
    pub l2: f64,
}

impl Regularizations {
    /// Fold the four contributions into one effective `(l1, l2)` pair for
    /// a J with `rows_with_j` occurrences and majorizer precision
    /// `majorizer_a`, given whether its current weight is exactly zero.
    pub fn effective(
        &self,
        rows_with_j: u32,
        majorizer_a: f64,
        weight_is_zero: bool,
    ) -> EffectiveRegularization {
        let sqrt_n = ((rows_with_j as f64) + 1.0).sqrt();
        let confidence_denom = majorizer_a.max(0.0).sqrt() + CONFIDENCE_EPSILON;

        let mut l1 = self.base.l1
            + self.div_sqrt_n.l1 / sqrt_n
            + self.mul_sqrt_n.l1 * sqrt_n
            + self.confidence.l1 / confidence_denom;
        let l2 = self.base.l2
            + self.div_sqrt_n.l2 / sqrt_n
            + self.mul_sqrt_n.l2 * sqrt_n
            + self.confidence.l2 / confidence_denom;

        if weight_is_zero {
            l1 += self.base.l1_at_weight_zero
                + self.div_sqrt_n.l1_at_weight_zero / sqrt_n
                + self.mul_sqrt_n.l1_at_weight_zero * sqrt_n
                + self.confidence.l1_at_weight_zero / confidence_denom;
        }

        EffectiveRegularization { l1, l2 }
    }

    /// The regularization loss contribution for one J at the given
    /// weight: `l1 * |w| + l2 * w^2`, using the non-weight-zero
    /// coefficients (the dead-zone term only affects the update rule,
    /// not the reported loss).
    pub fn loss_term(&self, rows_with_j: u32, majorizer_a: f64, weight: f64) -> f64 {
        let eff = self.effective(rows_with_j, majorizer_a, false);
        eff.l1 * weight.abs() + eff.l2 * weight * weight
    }

    /// `true` if every variant but `base` is zero, the precondition SGD
    /// imposes on regularization.
    pub fn is_standard(&self) -> bool {
        self.div_sqrt_n.is_zero() && self.mul_sqrt_n.is_zero() && self.confidence.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_only_is_standard() {
        let reg = Regularizations {
            base: RegularizationTerm {
                l1: 0.1,
                l2: 0.01,
                l1_at_weight_zero: 0.0,
            },
            ..Default::default()
        };
        assert!(reg.is_standard());
    }

    #[test]
    fn non_base_variant_is_not_standard() {
        let reg = Regularizations {
            div_sqrt_n: RegularizationTerm {
                l1: 0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!reg.is_standard());
    }

    #[test]
    fn dead_zone_term_only_applies_at_zero_weight() {
        let reg = Regularizations {
            base: RegularizationTerm {
                l1: 0.1,
                l2: 0.0,
                l1_at_weight_zero: 0.05,
            },
            ..Default::default()
        };
        let at_zero = reg.effective(10, 1.0, true);
        let away_from_zero = reg.effective(10, 1.0, false);
        assert!((at_zero.l1 - 0.15).abs() < 1e-12);
        assert!((away_from_zero.l1 - 0.1).abs() < 1e-12);
    }

    #[test]
    fn div_sqrt_n_shrinks_with_more_rows() {
        let reg = Regularizations {
            div_sqrt_n: RegularizationTerm {
                l1: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let few_rows = reg.effective(0, 1.0, false);
        let many_rows = reg.effective(99, 1.0, false);
        assert!(many_rows.l1 < few_rows.l1);
    }
}

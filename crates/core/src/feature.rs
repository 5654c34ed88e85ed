//! `JProduct`: a conjunction of atomic feature indices.

use crate::types::J;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A conjunction (AND) of atomic `J`'s, stored as a strictly sorted,
/// duplicate-free vector. The empty product is the bias term.
///
/// Strict ordering gives every `JProduct` a canonical representation, so
/// two factor sets that describe the same conjunction always compare equal
/// and hash equal — required for `ProductMap::intern` to dedupe correctly.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct JProduct(Vec<J>);

impl JProduct {
    /// The bias / intercept term: the empty product.
    pub fn bias() -> Self {
        Self(Vec::new())
    }

    /// Build a product from an arbitrary factor list, sorting and
    /// deduplicating it into the canonical form.
    pub fn from_factors(mut factors: Vec<J>) -> Self {
        factors.sort_unstable();
        factors.dedup();
        Self(factors)
    }

    /// A single atomic feature treated as a 1-factor product.
    pub fn atomic(j: J) -> Self {
        Self(vec![j])
    }

    /// Number of atomic factors (arity). `0` means the bias term.
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// `true` for the bias term.
    pub fn is_bias(&self) -> bool {
        self.0.is_empty()
    }

    /// The sorted factor list.
    pub fn factors(&self) -> &[J] {
        &self.0
    }

    /// `true` if every factor of `self` is present in `row`.
    ///
    /// `row` must be sorted (as CSR rows always are); this is the
    /// predicate the row extender evaluates once a child's
    /// factor count has been fully accumulated.
    pub fn factors_present_in(&self, row: &[J]) -> bool {
        self.0.iter().all(|f| row.binary_search(f).is_ok())
    }

    /// Sorted union of two products' factor sets, used by exploration
    /// to build a candidate pairing.
    pub fn union(a: &JProduct, b: &JProduct) -> Self {
        let mut merged = Vec::with_capacity(a.0.len() + b.0.len());
        merged.extend_from_slice(&a.0);
        merged.extend_from_slice(&b.0);
        merged.sort_unstable();
        merged.dedup();
        Self(merged)
    }

    /// The strictly-greatest factor, if any — used to assert the dependees
    /// DAG invariant "parent J < child J": a product's
    /// own interned `J` must exceed every one of its factors, which in
    /// particular must exceed this value when factors are themselves
    /// products (nested conjunctions are not constructed by this engine,
    /// but the check stays generic).
    pub fn max_factor(&self) -> Option<J> {
        self.0.last().copied()
    }
}

impl PartialEq for JProduct {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::hash::Hash for JProduct {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for JProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<bias>");
        }
        write!(f, "[")?;
        for (i, j) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{j}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_is_empty() {
        let bias = JProduct::bias();
        assert!(bias.is_bias());
        assert_eq!(bias.arity(), 0);
    }

    #[test]
    fn from_factors_sorts_and_dedupes() {
        let p = JProduct::from_factors(vec![3, 1, 2, 1]);
        assert_eq!(p.factors(), &[1, 2, 3]);
    }

    #[test]
    fn union_is_sorted_and_deduped() {
        let a = JProduct::from_factors(vec![1, 3]);
        let b = JProduct::from_factors(vec![2, 3]);
        let u = JProduct::union(&a, &b);
        assert_eq!(u.factors(), &[1, 2, 3]);
    }

    #[test]
    fn factors_present_in_row() {
        let p = JProduct::from_factors(vec![2, 5]);
        assert!(p.factors_present_in(&[1, 2, 5, 9]));
        assert!(!p.factors_present_in(&[1, 2, 9]));
    }

    #[test]
    fn equal_products_hash_equal() {
        use std::collections::HashSet;
        let a = JProduct::from_factors(vec![1, 2]);
        let b = JProduct::from_factors(vec![2, 1]);
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}

//! `ProductMap`: bimap from [`JProduct`] (a conjunction of atomic `J`'s) to `J`.

use crate::bimap::{Bimap, ConcurrentBimap};
use crate::error::Result;
use crate::renumbering::Renumbering;
use lre_core::{JProduct, Limits, J};
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

/// Thread-safe bimap assigning dense `J`'s to product (conjunction)
/// features. Atomic `J`'s referenced inside a `JProduct`
/// belong to a companion `FeatureMap`; this map does not validate that —
/// the dependees-DAG invariant ("parent < child") is the caller's
/// (`World`'s) responsibility to maintain at every structural change,
/// by construction.
pub struct ProductMap {
    inner: ConcurrentBimap<JProduct>,
}

impl ProductMap {
    /// Create an empty product map with its own private J counter. Use
    /// [`ProductMap::with_counter`] instead when a companion `FeatureMap`
    /// must share the same J space (the normal case inside `World`).
    pub fn new(limits: Limits) -> Self {
        Self {
            inner: ConcurrentBimap::new(limits),
        }
    }

    /// Create an empty product map drawing J's from a counter shared with
    /// a companion `FeatureMap`, so atomic and product J's interleave in
    /// one dense space — atomic J's inside products refer to `FeatureMap`
    /// entries.
    pub fn with_counter(limits: Limits, counter: Arc<AtomicU32>) -> Self {
        Self {
            inner: ConcurrentBimap::with_counter(limits, counter),
        }
    }

    /// Intern a product feature, returning its `J`.
    pub fn intern(&self, product: JProduct) -> Result<J> {
        self.inner.intern(product)
    }

    /// Look up the `J` for a product, if interned.
    pub fn lookup(&self, product: &JProduct) -> Option<J> {
        self.inner.lookup(product)
    }

    /// `true` if `product` has been interned.
    pub fn contains(&self, product: &JProduct) -> bool {
        self.inner.contains(product)
    }

    /// Look up the product for a `J` (requires a prior [`ProductMap::sync_j_to_key`]).
    pub fn j_to_key(&self, j: J) -> Option<Arc<JProduct>> {
        self.inner.j_to_key(j)
    }

    /// Materialize the dense `J -> JProduct` view.
    pub fn sync_j_to_key(&self) {
        self.inner.sync_j_to_key();
    }

    /// Apply a renumbering, compacting the map.
    pub fn renumber(&self, renumbering: &Renumbering) {
        self.inner.renumber(renumbering);
    }

    /// Number of live product features (including atomics registered as
    /// 1-factor products, if the caller chooses to mirror them here).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` if no products have been interned.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for ProductMap {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_products_by_canonical_form() {
        let map = ProductMap::default();
        let j1 = map.intern(JProduct::from_factors(vec![3, 1])).unwrap();
        let j2 = map.intern(JProduct::from_factors(vec![1, 3])).unwrap();
        assert_eq!(j1, j2);
    }

    #[test]
    fn bias_product_interns_once() {
        let map = ProductMap::default();
        let j1 = map.intern(JProduct::bias()).unwrap();
        let j2 = map.intern(JProduct::bias()).unwrap();
        assert_eq!(j1, j2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn shares_j_space_with_a_companion_feature_map() {
        use crate::feature_map::FeatureMap;
        use lre_core::FeatureName;

        let counter = Arc::new(AtomicU32::new(0));
        let features = FeatureMap::with_counter(Limits::default(), counter.clone());
        let products = ProductMap::with_counter(Limits::default(), counter);

        let j_a = features.intern(FeatureName::new("a")).unwrap();
        let j_b = features.intern(FeatureName::new("b")).unwrap();
        let j_product = products
            .intern(JProduct::from_factors(vec![j_a, j_b]))
            .unwrap();

        assert!(j_a < j_product);
        assert!(j_b < j_product);
        assert_eq!(products.len() + features.len(), 3);
    }
}

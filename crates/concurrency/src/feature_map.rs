//! `FeatureMap`: bimap from atomic [`FeatureName`] to `J`.

use crate::bimap::{Bimap, ConcurrentBimap};
use crate::error::Result;
use crate::renumbering::Renumbering;
use lre_core::{FeatureName, Limits, J};
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

/// Thread-safe bimap assigning dense `J`'s to atomic string features
/// shared with `ProductMap`.
pub struct FeatureMap {
    inner: ConcurrentBimap<FeatureName>,
}

impl FeatureMap {
    /// Create an empty feature map with its own private J counter. Use
    /// [`FeatureMap::with_counter`] instead when a companion `ProductMap`
    /// must share the same J space (the normal case inside `World`).
    pub fn new(limits: Limits) -> Self {
        Self {
            inner: ConcurrentBimap::new(limits),
        }
    }

    /// Create an empty feature map drawing J's from a counter shared with
    /// a companion `ProductMap`.
    pub fn with_counter(limits: Limits, counter: Arc<AtomicU32>) -> Self {
        Self {
            inner: ConcurrentBimap::with_counter(limits, counter),
        }
    }

    /// Intern a feature name, returning its `J`.
    pub fn intern(&self, name: impl Into<FeatureName>) -> Result<J> {
        self.inner.intern(name.into())
    }

    /// Look up the `J` for a feature name, if interned.
    pub fn lookup(&self, name: &FeatureName) -> Option<J> {
        self.inner.lookup(name)
    }

    /// `true` if `name` has been interned.
    pub fn contains(&self, name: &FeatureName) -> bool {
        self.inner.contains(name)
    }

    /// Look up the feature name for a `J` (requires a prior [`FeatureMap::sync_j_to_key`]).
    pub fn j_to_key(&self, j: J) -> Option<Arc<FeatureName>> {
        self.inner.j_to_key(j)
    }

    /// Materialize the dense `J -> FeatureName` view.
    pub fn sync_j_to_key(&self) {
        self.inner.sync_j_to_key();
    }

    /// Apply a renumbering, compacting the map.
    pub fn renumber(&self, renumbering: &Renumbering) {
        self.inner.renumber(renumbering);
    }

    /// Number of live atomic features.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` if no features have been interned.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for FeatureMap {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_and_syncs() {
        let map = FeatureMap::default();
        let j = map.intern("age>30").unwrap();
        assert_eq!(map.lookup(&FeatureName::new("age>30")), Some(j));
        map.sync_j_to_key();
        assert_eq!(map.j_to_key(j).map(|n| n.as_str().to_string()), Some("age>30".to_string()));
    }
}

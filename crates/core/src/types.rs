//! Dense feature indices, row identifiers, and atomic feature names.
//!
//! The invariants these types encode:
//! `J` spans `[0, J_size)` with no gaps after a sync, `INVALID_J` is the
//! tombstone used during renumbering, and row ids are unique 32-bit values
//! with their own reserved sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Dense 32-bit feature index assigned by [`crate::Limits`]-bounded counters
/// in `FeatureMap`/`ProductMap`. Atomic features and product features share
/// the same `J` space; the dependees DAG invariant
/// requires that a product's `J` is always strictly greater than every
/// atomic `J` it is built from.
pub type J = u32;

/// Reserved sentinel meaning "no such J" / "removed" in a [`Renumbering`](crate::Renumbering).
pub const INVALID_J: J = u32::MAX;

/// Unique 32-bit row identifier. Rows carry one for determinism checks in
/// `Stats` and for the `(row_id, w·x)` score output contract
/// returned to callers.
pub type RowId = u32;

/// Reserved sentinel meaning "row id not supplied".
pub const INVALID_ID: RowId = u32::MAX;

/// Optional per-row user identifier, carried alongside the row but never
/// interpreted by the core (`Shard` entity).
pub type UserId = u64;

/// An atomic string-named boolean feature.
///
/// Immutable once constructed and hashed by string content, matching the
/// `FeatureName` invariant. Stored as an `Arc<str>` so that
/// `FeatureMap`'s interned records and any caller-held copies share the
/// same heap allocation without `Clone`-induced string copies, the same
/// trade-off made for interned key records elsewhere in this crate family.
#[derive(Clone, Eq, Serialize, Deserialize)]
pub struct FeatureName(Arc<str>);

impl FeatureName {
    /// Construct a feature name from any string-like value.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for FeatureName {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl std::hash::Hash for FeatureName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl From<&str> for FeatureName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FeatureName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for FeatureName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The training label. Spec.md §1/§6 only ever allow `+1`/`-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Positive class.
    Positive,
    /// Negative class.
    Negative,
}

impl Label {
    /// Numeric `{-1.0, +1.0}` form used in every loss/gradient formula.
    #[inline]
    pub fn signed(self) -> f64 {
        match self {
            Label::Positive => 1.0,
            Label::Negative => -1.0,
        }
    }

    /// Parse from the LIBSVM-style `-1`/`+1` token. Any other
    /// value is a data error, which is the caller's (LIBSVM-reader
    /// collaborator's) concern, not this type's — so this returns `None`
    /// rather than raising `core::Error`.
    pub fn from_token(v: i32) -> Option<Self> {
        match v {
            1 => Some(Label::Positive),
            -1 => Some(Label::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Label::Positive { "+1" } else { "-1" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_name_equality_is_by_content() {
        let a = FeatureName::new("gender=male");
        let b = FeatureName::new("gender=male".to_string());
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
    }

    #[test]
    fn label_round_trip() {
        assert_eq!(Label::from_token(1), Some(Label::Positive));
        assert_eq!(Label::from_token(-1), Some(Label::Negative));
        assert_eq!(Label::from_token(0), None);
        assert_eq!(Label::Positive.signed(), 1.0);
        assert_eq!(Label::Negative.signed(), -1.0);
    }
}

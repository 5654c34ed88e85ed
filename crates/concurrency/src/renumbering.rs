//! `Renumbering`: an injection from old `J` to new `J`, used to compact
//! the feature universe after pruning.

use crate::error::{Error, Result};
use lre_core::{J, INVALID_J};

/// A complete old-J → new-J mapping, with [`INVALID_J`] marking removal.
///
/// Survivors are renumbered densely, preserving their relative order
/// surviving J's preserve relative order.
#[derive(Debug, Clone)]
pub struct Renumbering {
    /// `map[old_j] == new_j`, or `INVALID_J` if `old_j` was removed.
    map: Vec<J>,
    /// Number of surviving J's — the new J space is `[0, next_j)`.
    next_j: J,
}

impl Renumbering {
    /// Build a renumbering that removes exactly the J's in `removed`
    /// (indices `0..j_size`), compacting the remainder in order.
    pub fn from_removed(j_size: u32, removed: &[bool]) -> Result<Self> {
        if removed.len() != j_size as usize {
            return Err(Error::RenumberOutOfBounds(removed.len() as u32, j_size));
        }
        let mut map = vec![INVALID_J; j_size as usize];
        let mut next = 0u32;
        for (old_j, &is_removed) in removed.iter().enumerate() {
            if !is_removed {
                map[old_j] = next;
                next += 1;
            }
        }
        Ok(Self { map, next_j: next })
    }

    /// The identity renumbering over `[0, j_size)` — a structural no-op,
    /// used when `add_features` needs to route through the same choke
    /// point as pruning without actually removing anything.
    pub fn identity(j_size: u32) -> Self {
        Self {
            map: (0..j_size).collect(),
            next_j: j_size,
        }
    }

    /// Map an old `J` to its new value, or `INVALID_J` if removed.
    pub fn get(&self, old_j: J) -> J {
        self.map
            .get(old_j as usize)
            .copied()
            .unwrap_or(INVALID_J)
    }

    /// `true` if `old_j` survives the renumbering.
    pub fn survives(&self, old_j: J) -> bool {
        self.get(old_j) != INVALID_J
    }

    /// Size of the old J space this renumbering was built for.
    pub fn old_size(&self) -> u32 {
        self.map.len() as u32
    }

    /// Size of the new, compacted J space.
    pub fn new_size(&self) -> u32 {
        self.next_j
    }

    /// Iterate `(old_j, new_j)` pairs for every surviving J, in ascending
    /// old-J (and therefore ascending new-J) order.
    pub fn survivors(&self) -> impl Iterator<Item = (J, J)> + '_ {
        self.map
            .iter()
            .enumerate()
            .filter(|(_, &new_j)| new_j != INVALID_J)
            .map(|(old_j, &new_j)| (old_j as J, new_j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compacts_preserving_order() {
        // remove J=1 out of {0,1,2,3}
        let r = Renumbering::from_removed(4, &[false, true, false, false]).unwrap();
        assert_eq!(r.new_size(), 3);
        assert_eq!(r.get(0), 0);
        assert_eq!(r.get(1), INVALID_J);
        assert_eq!(r.get(2), 1);
        assert_eq!(r.get(3), 2);
    }

    #[test]
    fn identity_preserves_all() {
        let r = Renumbering::identity(5);
        assert_eq!(r.new_size(), 5);
        for j in 0..5 {
            assert_eq!(r.get(j), j);
        }
    }

    #[test]
    fn survivors_enumerates_in_order() {
        let r = Renumbering::from_removed(3, &[true, false, false]).unwrap();
        let pairs: Vec<_> = r.survivors().collect();
        assert_eq!(pairs, vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn rejects_mismatched_size() {
        assert!(Renumbering::from_removed(3, &[false, false]).is_err());
    }
}

//! `CooMatrix`: a sortable coordinate list, convertible to CSR. Used as
//! the assembly format for the dependees graph while exploration is
//! adding new `(parent -> child)` edges.

use crate::csr::CsrMatrix;
use crate::error::{Error, Result};
use lre_core::J;

/// A coordinate-list sparse matrix: `(row, col)` pairs, not necessarily
/// sorted or deduplicated until [`CooMatrix::sort`] is called.
#[derive(Debug, Clone, Default)]
pub struct CooMatrix {
    entries: Vec<(J, J)>,
    sorted: bool,
}

impl CooMatrix {
    /// An empty COO matrix.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            sorted: true,
        }
    }

    /// Append one `(row, col)` coordinate. Marks the matrix unsorted.
    pub fn push(&mut self, row: J, col: J) {
        self.entries.push((row, col));
        self.sorted = false;
    }

    /// Number of coordinate entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort entries by `(row, col)`, the required precondition for
    /// [`CooMatrix::to_csr`].
    pub fn sort(&mut self) {
        self.entries.sort_unstable();
        self.sorted = true;
    }

    /// `true` if [`CooMatrix::sort`] has been called since the last push.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Borrow the sorted entries.
    pub fn entries(&self) -> &[(J, J)] {
        &self.entries
    }

    /// Convert to a row-major CSR matrix. The COO matrix must already be
    /// sorted; `row_count` pads the result with empty rows past the
    /// highest observed row index (needed so a dependees CSR has exactly
    /// one row per atomic J, even for atomics with no dependent products).
    pub fn to_csr(&self, row_count: u32) -> Result<CsrMatrix> {
        if !self.sorted {
            return Err(Error::UnsortedCoo);
        }
        let mut csr = CsrMatrix::with_row_capacity(row_count as usize);
        let mut cursor = 0usize;
        for row in 0..row_count {
            let mut cols = Vec::new();
            while cursor < self.entries.len() && self.entries[cursor].0 == row {
                cols.push(self.entries[cursor].1);
                cursor += 1;
            }
            csr.append_row(&cols)?;
        }
        Ok(csr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_then_to_csr_then_to_coo_round_trips() {
        let mut coo = CooMatrix::new();
        coo.push(1, 5);
        coo.push(0, 2);
        coo.push(0, 1);
        coo.sort();
        let expected = coo.entries().to_vec();

        let csr = coo.to_csr(2).unwrap();
        let round_tripped = csr.to_coo();

        let mut round_tripped_entries = round_tripped.entries().to_vec();
        round_tripped_entries.sort_unstable();
        assert_eq!(round_tripped_entries, expected);
    }

    #[test]
    fn to_csr_before_sort_is_rejected() {
        let mut coo = CooMatrix::new();
        coo.push(1, 1);
        assert!(matches!(coo.to_csr(2), Err(Error::UnsortedCoo)));
    }

    #[test]
    fn pads_rows_with_no_entries() {
        let mut coo = CooMatrix::new();
        coo.push(3, 7);
        coo.sort();
        let csr = coo.to_csr(5).unwrap();
        assert_eq!(csr.row_count(), 5);
        assert!(csr.row(0).is_empty());
        assert_eq!(csr.row(3), &[7]);
    }
}

//! `CsrMatrix`: row-major sparse boolean storage.
//!
//! Stores a flat content vector of `J`'s plus a `boundaries` vector of
//! length `rows + 1`, so row `r` occupies `content[boundaries[r] ..
//! boundaries[r+1]]`. Each entry is the `J` of an atomic or product
//! feature present in that row; content length is bounded at `2^32 - 1`.

use crate::error::{Error, Result};
use lre_concurrency::Renumbering;
use lre_core::{Limits, J, INVALID_J};

/// Row-major CSR sparse boolean matrix.
#[derive(Debug, Clone, Default)]
pub struct CsrMatrix {
    content: Vec<J>,
    boundaries: Vec<u32>,
    limits: Limits,
}

impl CsrMatrix {
    /// An empty matrix (one boundary, zero rows).
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
            boundaries: vec![0],
            limits: Limits::default(),
        }
    }

    /// An empty matrix pre-sized for `row_capacity` rows.
    pub fn with_row_capacity(row_capacity: usize) -> Self {
        let mut boundaries = Vec::with_capacity(row_capacity + 1);
        boundaries.push(0);
        Self {
            content: Vec::new(),
            boundaries,
            limits: Limits::default(),
        }
    }

    /// Append a row. `row` should already be sorted and duplicate-free —
    /// every caller in this engine (dependees edges, extended data rows)
    /// constructs rows that way, since downstream binary-search lookups
    /// (`JProduct::factors_present_in`, the row extender) rely on it.
    pub fn append_row(&mut self, row: &[J]) -> Result<()> {
        let new_len = self.content.len() as u64 + row.len() as u64;
        self.limits
            .check_csr_len(new_len)
            .map_err(Error::Core)?;
        self.content.extend_from_slice(row);
        self.boundaries.push(self.content.len() as u32);
        Ok(())
    }

    /// Number of rows.
    pub fn row_count(&self) -> u32 {
        (self.boundaries.len() - 1) as u32
    }

    /// Total non-zero entry count.
    pub fn nnz(&self) -> usize {
        self.content.len()
    }

    /// Zero-copy view of one row's `J`'s.
    pub fn row(&self, r: u32) -> &[J] {
        let start = self.boundaries[r as usize] as usize;
        let end = self.boundaries[r as usize + 1] as usize;
        &self.content[start..end]
    }

    /// Number of non-zero entries in one row.
    pub fn row_nnz(&self, r: u32) -> usize {
        let start = self.boundaries[r as usize] as usize;
        let end = self.boundaries[r as usize + 1] as usize;
        end - start
    }

    /// Rewrite every row's contents by applying `renumbering` to each
    /// `J`, dropping tombstoned entries and compacting in place.
    /// Renumbering preserves relative order so rows remain sorted.
    pub fn remove_and_renumber_js(&mut self, renumbering: &Renumbering) {
        let mut new_content = Vec::with_capacity(self.content.len());
        let mut new_boundaries = Vec::with_capacity(self.boundaries.len());
        new_boundaries.push(0u32);
        for r in 0..self.row_count() {
            let row = self.row(r);
            for &j in row {
                let new_j = renumbering.get(j);
                if new_j != INVALID_J {
                    new_content.push(new_j);
                }
            }
            new_boundaries.push(new_content.len() as u32);
        }
        self.content = new_content;
        self.boundaries = new_boundaries;
    }

    /// Permute/drop whole rows by treating the row index itself as a `J`
    /// under `renumbering`.
    /// Used when the dependees CSR's row axis (indexed by atomic J) must
    /// track an atomic-feature renumbering.
    pub fn remove_and_renumber_rows(&mut self, renumbering: &Renumbering) {
        let mut rows: Vec<Option<Vec<J>>> = vec![None; renumbering.new_size() as usize];
        for (old_r, new_r) in renumbering.survivors() {
            if old_r < self.row_count() {
                rows[new_r as usize] = Some(self.row(old_r).to_vec());
            }
        }
        let mut new_content = Vec::new();
        let mut new_boundaries = vec![0u32];
        for row in rows {
            let row = row.unwrap_or_default();
            new_content.extend_from_slice(&row);
            new_boundaries.push(new_content.len() as u32);
        }
        self.content = new_content;
        self.boundaries = new_boundaries;
    }

    /// Convert to a COO coordinate list (used only on the
    /// dependees build path, and in round-trip tests).
    pub fn to_coo(&self) -> crate::coo::CooMatrix {
        let mut coo = crate::coo::CooMatrix::new();
        for r in 0..self.row_count() {
            for &j in self.row(r) {
                coo.push(r, j);
            }
        }
        coo.sort();
        coo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lre_concurrency::Renumbering;

    #[test]
    fn append_and_row_round_trip() {
        let mut csr = CsrMatrix::new();
        csr.append_row(&[1, 3, 5]).unwrap();
        csr.append_row(&[]).unwrap();
        csr.append_row(&[2]).unwrap();
        assert_eq!(csr.row_count(), 3);
        assert_eq!(csr.row(0), &[1, 3, 5]);
        assert!(csr.row(1).is_empty());
        assert_eq!(csr.row(2), &[2]);
        assert_eq!(csr.nnz(), 4);
    }

    #[test]
    fn remove_and_renumber_js_compacts_each_row() {
        let mut csr = CsrMatrix::new();
        csr.append_row(&[0, 1, 2]).unwrap();
        csr.append_row(&[1]).unwrap();
        // remove J=1
        let renumbering = Renumbering::from_removed(3, &[false, true, false]).unwrap();
        csr.remove_and_renumber_js(&renumbering);
        assert_eq!(csr.row(0), &[renumbering.get(0), renumbering.get(2)]);
        assert!(csr.row(1).is_empty());
    }

    #[test]
    fn remove_and_renumber_rows_permutes_whole_rows() {
        let mut csr = CsrMatrix::new();
        csr.append_row(&[10]).unwrap(); // row 0
        csr.append_row(&[20]).unwrap(); // row 1
        csr.append_row(&[30]).unwrap(); // row 2
        let renumbering = Renumbering::from_removed(3, &[false, true, false]).unwrap();
        csr.remove_and_renumber_rows(&renumbering);
        assert_eq!(csr.row_count(), 2);
        assert_eq!(csr.row(0), &[10]);
        assert_eq!(csr.row(1), &[30]);
    }
}

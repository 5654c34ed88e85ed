//! A single shard: a CSR of rows plus parallel per-row label/id columns.

use crate::csr::CsrMatrix;
use crate::dependees::{Dependees, RowExtender};
use crate::error::Result;
use lre_core::{Label, RowId, J};

/// One bounded chunk of training rows.
///
/// A shard holds up to `max_shard_size` total non-zero entries across all
/// its rows (tracked via the underlying CSR's `nnz`). The first row
/// appended to an empty shard is always accepted, even if it alone
/// exceeds the limit — callers roll over to a fresh shard only once a
/// shard already holds data.
#[derive(Debug, Clone, Default)]
pub struct Shard {
    rows: CsrMatrix,
    labels: Vec<Label>,
    row_ids: Vec<RowId>,
    user_ids: Vec<Option<u64>>,
}

impl Shard {
    /// An empty shard.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if appending `additional_nnz` entries would exceed
    /// `max_shard_size`, given this shard already holds at least one row.
    pub fn would_exceed(&self, additional_nnz: usize, max_shard_size: u32) -> bool {
        self.row_count() > 0
            && self.rows.nnz() as u64 + additional_nnz as u64 > max_shard_size as u64
    }

    /// Append one row. `row` must already be sorted and duplicate-free.
    pub fn append_row(
        &mut self,
        row: &[J],
        label: Label,
        row_id: RowId,
        user_id: Option<u64>,
    ) -> Result<()> {
        self.rows.append_row(row)?;
        self.labels.push(label);
        self.row_ids.push(row_id);
        self.user_ids.push(user_id);
        Ok(())
    }

    /// Number of rows in this shard.
    pub fn row_count(&self) -> u32 {
        self.rows.row_count()
    }

    /// Total non-zero entries in this shard.
    pub fn nnz(&self) -> usize {
        self.rows.nnz()
    }

    /// Zero-copy view of one row's J's.
    pub fn row(&self, r: u32) -> &[J] {
        self.rows.row(r)
    }

    /// The label of one row.
    pub fn label(&self, r: u32) -> Label {
        self.labels[r as usize]
    }

    /// The row id of one row.
    pub fn row_id(&self, r: u32) -> RowId {
        self.row_ids[r as usize]
    }

    /// The user id of one row, if any.
    pub fn user_id(&self, r: u32) -> Option<u64> {
        self.user_ids[r as usize]
    }

    /// Rewrite every row's J content under a renumbering, dropping
    /// tombstoned entries.
    pub fn remove_and_renumber_js(&mut self, renumbering: &lre_concurrency::Renumbering) {
        self.rows.remove_and_renumber_js(renumbering);
    }

    /// Re-run the row extender over every stored row against a grown
    /// `dependees` graph, materializing any product features that newly
    /// became derivable (e.g. after exploration registered edges over
    /// features these rows already contained).
    pub fn re_extend(&mut self, dependees: &Dependees) -> Result<()> {
        let mut rebuilt = CsrMatrix::with_row_capacity(self.row_count() as usize);
        for r in 0..self.row_count() {
            let extended = RowExtender::extend(self.rows.row(r), dependees);
            rebuilt.append_row(&extended)?;
        }
        self.rows = rebuilt;
        Ok(())
    }

    /// Iterate `(row_index, row, label, row_id, user_id)` over every row.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[J], Label, RowId, Option<u64>)> {
        (0..self.row_count()).map(move |r| {
            (
                r,
                self.row(r),
                self.label(r),
                self.row_id(r),
                self.user_id(r),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_is_always_accepted() {
        let shard = Shard::new();
        assert!(!shard.would_exceed(1_000_000, 10));
    }

    #[test]
    fn subsequent_row_respects_limit() {
        let mut shard = Shard::new();
        shard.append_row(&[0, 1, 2], Label::Positive, 0, None).unwrap();
        assert!(shard.would_exceed(8, 10));
        assert!(!shard.would_exceed(2, 10));
    }

    #[test]
    fn append_and_read_back() {
        let mut shard = Shard::new();
        shard
            .append_row(&[1, 2], Label::Positive, 7, Some(42))
            .unwrap();
        shard
            .append_row(&[3], Label::Negative, 8, None)
            .unwrap();
        assert_eq!(shard.row_count(), 2);
        assert_eq!(shard.row(0), &[1, 2]);
        assert_eq!(shard.label(1), Label::Negative);
        assert_eq!(shard.row_id(0), 7);
        assert_eq!(shard.user_id(0), Some(42));
        assert_eq!(shard.user_id(1), None);
    }
}

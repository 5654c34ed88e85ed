//! A bounded sequence of [`Shard`]s with automatic rollover.

use crate::dependees::Dependees;
use crate::error::Result;
use crate::shard::Shard;
use lre_core::{Label, RowId, J};

/// A sequence of [`Shard`]s, each capped at `max_shard_size` non-zero
/// entries. Appending a row that would overflow the current shard rolls
/// over to a new one; the first row of a fresh shard is always accepted.
#[derive(Debug, Clone)]
pub struct ShardSet {
    shards: Vec<Shard>,
    max_shard_size: u32,
}

impl ShardSet {
    /// An empty shard set with the given per-shard entry cap.
    pub fn new(max_shard_size: u32) -> Self {
        Self {
            shards: vec![Shard::new()],
            max_shard_size,
        }
    }

    /// Current per-shard entry cap.
    pub fn max_shard_size(&self) -> u32 {
        self.max_shard_size
    }

    /// Change the per-shard entry cap for future appends. Existing shards
    /// are left as-is.
    pub fn set_max_shard_size(&mut self, max_shard_size: u32) {
        self.max_shard_size = max_shard_size;
    }

    /// Append one row, rolling over to a new shard if the current one
    /// would exceed `max_shard_size`.
    pub fn append_row(
        &mut self,
        row: &[J],
        label: Label,
        row_id: RowId,
        user_id: Option<u64>,
    ) -> Result<()> {
        let nnz = row.len();
        let needs_new_shard = self
            .shards
            .last()
            .is_some_and(|s| s.would_exceed(nnz, self.max_shard_size));
        if needs_new_shard {
            tracing::trace!(shard_count = self.shards.len() + 1, "rolling over to a new shard");
            self.shards.push(Shard::new());
        }
        self.shards
            .last_mut()
            .expect("shard set always has at least one shard")
            .append_row(row, label, row_id, user_id)
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total row count across all shards.
    pub fn row_count(&self) -> u64 {
        self.shards.iter().map(|s| s.row_count() as u64).sum()
    }

    /// Total non-zero entry count across all shards.
    pub fn nnz(&self) -> u64 {
        self.shards.iter().map(|s| s.nnz() as u64).sum()
    }

    /// Borrow all shards.
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Mutably borrow all shards.
    pub fn shards_mut(&mut self) -> &mut [Shard] {
        &mut self.shards
    }

    /// Rewrite every shard's row J content under a renumbering (the
    /// pruning path: shard contents track a feature-universe compaction).
    pub fn remove_and_renumber_js(&mut self, renumbering: &lre_concurrency::Renumbering) {
        for shard in &mut self.shards {
            shard.remove_and_renumber_js(renumbering);
        }
    }

    /// Re-extend every shard's rows against a grown dependees graph (the
    /// `World::add_features` choke point: a fresh product feature can
    /// retroactively apply to rows that were appended before it existed).
    pub fn re_extend_all(&mut self, dependees: &Dependees) -> Result<()> {
        for shard in &mut self.shards {
            shard.re_extend(dependees)?;
        }
        Ok(())
    }

    /// Split the shard index range `[0, shard_count)` into up to
    /// `worker_count` contiguous chunks, for fork/join passes over shards
    /// (majorizer folding, stats recalculation).
    pub fn chunk_ranges(&self, worker_count: usize) -> Vec<std::ops::Range<usize>> {
        let total = self.shards.len();
        if total == 0 || worker_count == 0 {
            return Vec::new();
        }
        let workers = worker_count.min(total.max(1));
        let base = total / workers;
        let extra = total % workers;
        let mut ranges = Vec::with_capacity(workers);
        let mut start = 0;
        for w in 0..workers {
            let len = base + if w < extra { 1 } else { 0 };
            if len == 0 {
                continue;
            }
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolls_over_when_limit_exceeded() {
        let mut set = ShardSet::new(2);
        set.append_row(&[0, 1], Label::Positive, 0, None).unwrap();
        set.append_row(&[2], Label::Negative, 1, None).unwrap();
        assert_eq!(set.shard_count(), 2);
        assert_eq!(set.shards()[0].row_count(), 1);
        assert_eq!(set.shards()[1].row_count(), 1);
    }

    #[test]
    fn oversized_first_row_is_accepted() {
        let mut set = ShardSet::new(1);
        set.append_row(&[0, 1, 2, 3], Label::Positive, 0, None)
            .unwrap();
        assert_eq!(set.shard_count(), 1);
        assert_eq!(set.nnz(), 4);
    }

    #[test]
    fn chunk_ranges_cover_all_shards_without_overlap() {
        let mut set = ShardSet::new(1);
        for i in 0..7u32 {
            set.append_row(&[i], Label::Positive, i, None).unwrap();
        }
        let ranges = set.chunk_ranges(3);
        let covered: usize = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(covered, set.shard_count());
        for w in ranges.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
    }
}

//! Per-J co-occurrence statistics and their derived scoring quantities.

use crate::shard_set::ShardSet;
use lre_core::{Label, J};

/// Keeps `positive[j]`, `negative[j]`, and a 64-bit XOR row-id hash per
/// J, plus label totals, used both to score features for exploration and
/// pruning and as a cheap determinism check (the XOR hash is
/// order-independent, so two runs that processed the same rows in a
/// different order still agree).
#[derive(Debug, Clone, Default)]
pub struct Stats {
    positive: Vec<u32>,
    negative: Vec<u32>,
    row_id_xor: Vec<u64>,
    positive_rows: u64,
    negative_rows: u64,
}

/// A 2x2 contingency table for one J against the label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contingency {
    /// Rows with J present, label positive.
    pub a: f64,
    /// Rows with J absent, label positive.
    pub b: f64,
    /// Rows with J present, label negative.
    pub c: f64,
    /// Rows with J absent, label negative.
    pub d: f64,
}

const SMOOTHING: f64 = 0.5;

impl Stats {
    /// An all-zero `Stats` sized for `j_size` J's.
    pub fn new(j_size: u32) -> Self {
        Self {
            positive: vec![0; j_size as usize],
            negative: vec![0; j_size as usize],
            row_id_xor: vec![0; j_size as usize],
            positive_rows: 0,
            negative_rows: 0,
        }
    }

    /// Grow (never shrink) to accommodate a larger J space, zero-filling
    /// new entries.
    pub fn resize(&mut self, j_size: u32) {
        self.positive.resize(j_size as usize, 0);
        self.negative.resize(j_size as usize, 0);
        self.row_id_xor.resize(j_size as usize, 0);
    }

    /// Current J capacity.
    pub fn j_size(&self) -> u32 {
        self.positive.len() as u32
    }

    /// Fold one row's contribution into this `Stats`.
    pub fn record_row(&mut self, row: &[J], label: Label, row_id: u32) {
        match label {
            Label::Positive => self.positive_rows += 1,
            Label::Negative => self.negative_rows += 1,
        }
        for &j in row {
            let idx = j as usize;
            match label {
                Label::Positive => self.positive[idx] += 1,
                Label::Negative => self.negative[idx] += 1,
            }
            self.row_id_xor[idx] ^= row_id as u64;
        }
    }

    /// Merge another shard's partial `Stats` into this one (sum).
    pub fn merge(&mut self, other: &Stats) {
        debug_assert_eq!(self.j_size(), other.j_size());
        for j in 0..self.positive.len() {
            self.positive[j] += other.positive[j];
            self.negative[j] += other.negative[j];
            self.row_id_xor[j] ^= other.row_id_xor[j];
        }
        self.positive_rows += other.positive_rows;
        self.negative_rows += other.negative_rows;
    }

    /// Total rows with label positive.
    pub fn positive_rows(&self) -> u64 {
        self.positive_rows
    }

    /// Total rows with label negative.
    pub fn negative_rows(&self) -> u64 {
        self.negative_rows
    }

    /// Total rows containing J.
    pub fn rows_with_j(&self, j: J) -> u32 {
        self.positive[j as usize] + self.negative[j as usize]
    }

    /// XOR hash of row ids that contain J, for determinism checks.
    pub fn row_id_xor(&self, j: J) -> u64 {
        self.row_id_xor[j as usize]
    }

    /// The 2x2 contingency table for J against the label.
    pub fn contingency(&self, j: J) -> Contingency {
        let a = self.positive[j as usize] as f64;
        let c = self.negative[j as usize] as f64;
        let b = (self.positive_rows as f64 - a).max(0.0);
        let d = (self.negative_rows as f64 - c).max(0.0);
        Contingency { a, b, c, d }
    }

    /// Mutual information between J's presence and the label, with
    /// additive smoothing to avoid `log(0)`.
    pub fn mutual_information(&self, j: J) -> f64 {
        let t = self.contingency(j);
        let n = (t.a + t.b + t.c + t.d + 4.0 * SMOOTHING).max(1.0);
        let cells = [
            (t.a + SMOOTHING, t.a + t.c + 2.0 * SMOOTHING, t.a + t.b + 2.0 * SMOOTHING),
            (t.b + SMOOTHING, t.b + t.d + 2.0 * SMOOTHING, t.a + t.b + 2.0 * SMOOTHING),
            (t.c + SMOOTHING, t.a + t.c + 2.0 * SMOOTHING, t.c + t.d + 2.0 * SMOOTHING),
            (t.d + SMOOTHING, t.b + t.d + 2.0 * SMOOTHING, t.c + t.d + 2.0 * SMOOTHING),
        ];
        cells
            .iter()
            .map(|&(joint, margin_row, margin_col)| {
                let p_joint = joint / n;
                let p_row = margin_row / n;
                let p_col = margin_col / n;
                p_joint * (p_joint / (p_row * p_col)).ln()
            })
            .sum()
    }

    /// The phi coefficient (Pearson correlation for two binary variables).
    pub fn phi_coefficient(&self, j: J) -> f64 {
        let t = self.contingency(j);
        let numerator = t.a * t.d - t.b * t.c;
        let denominator =
            ((t.a + t.b) * (t.c + t.d) * (t.a + t.c) * (t.b + t.d)).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    /// Log-odds of the label given J's presence, with additive smoothing.
    pub fn log_odds(&self, j: J) -> f64 {
        let t = self.contingency(j);
        ((t.a + SMOOTHING) * (t.d + SMOOTHING) / ((t.b + SMOOTHING) * (t.c + SMOOTHING))).ln()
    }
}

/// Rebuild `Stats` from scratch by a fork/join pass over `shard_set`'s
/// shards, splitting shard ranges across `worker_count` threads, each
/// accumulating into its own `Stats`, then summing the partials into the
/// canonical result.
pub fn recalc_stats(shard_set: &ShardSet, j_size: u32, worker_count: usize) -> Stats {
    let ranges = shard_set.chunk_ranges(worker_count.max(1));
    let shards = shard_set.shards();

    let partials: Vec<Stats> = std::thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .into_iter()
            .map(|range| {
                let shards = &shards[range];
                scope.spawn(move || {
                    let mut local = Stats::new(j_size);
                    for shard in shards {
                        for (_, row, label, row_id, _) in shard.iter() {
                            local.record_row(row, label, row_id);
                        }
                    }
                    local
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("stats worker thread panicked"))
            .collect()
    });

    let mut canonical = Stats::new(j_size);
    for partial in &partials {
        canonical.merge(partial);
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_merge_sums_counts() {
        let mut a = Stats::new(3);
        a.record_row(&[0, 1], Label::Positive, 5);
        let mut b = Stats::new(3);
        b.record_row(&[1, 2], Label::Negative, 9);
        a.merge(&b);
        assert_eq!(a.positive_rows(), 1);
        assert_eq!(a.negative_rows(), 1);
        assert_eq!(a.rows_with_j(1), 2);
        assert_eq!(a.row_id_xor(1), 5 ^ 9);
    }

    #[test]
    fn phi_coefficient_is_perfect_for_identical_signal() {
        let mut stats = Stats::new(1);
        for i in 0..10u32 {
            stats.record_row(&[0], Label::Positive, i);
        }
        for i in 10..20u32 {
            stats.record_row(&[], Label::Negative, i);
        }
        let phi = stats.phi_coefficient(0);
        assert!((phi - 1.0).abs() < 1e-9);
    }

    #[test]
    fn recalc_stats_matches_serial_accumulation() {
        let mut set = ShardSet::new(1000);
        for i in 0..20u32 {
            let label = if i % 2 == 0 {
                Label::Positive
            } else {
                Label::Negative
            };
            set.append_row(&[i % 5], label, i, None).unwrap();
        }
        let parallel = recalc_stats(&set, 5, 4);

        let mut serial = Stats::new(5);
        for shard in set.shards() {
            for (_, row, label, row_id, _) in shard.iter() {
                serial.record_row(row, label, row_id);
            }
        }

        assert_eq!(parallel.positive_rows(), serial.positive_rows());
        assert_eq!(parallel.negative_rows(), serial.negative_rows());
        for j in 0..5 {
            assert_eq!(parallel.rows_with_j(j), serial.rows_with_j(j));
            assert_eq!(parallel.row_id_xor(j), serial.row_id_xor(j));
        }
    }
}

//! Priority-driven product-feature exploration.
//!
//! Candidate conjunctions are proposed by ranking each row's `J`'s by
//! score (highest first) and pairing consecutive ranks. A max-heap seeded
//! with one `(rank 0, rank 1)` candidate per row pops the globally best
//! pair first; popping a row's candidate pushes that row's next pair
//! `(rank i+1, rank i+2)`, so the heap behaves like a k-way merge of
//! per-row descending pair-sum sequences.

use crate::error::Result;
use lre_concurrency::ProductMap;
use lre_core::{JProduct, J};
use lre_storage::{Dependees, DependeeEdge, ShardSet, Stats};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Bounds on one exploration round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplorationConfig {
    /// Stop once this many new product features have been interned.
    pub max_new_features: u32,
    /// Stop once this many heap candidates have been popped, even if
    /// `max_new_features` has not been reached (bounds wasted work when
    /// the universe is mostly already explored).
    pub max_candidates_considered: u32,
    /// Reject a candidate whose factor count would exceed this arity.
    pub max_product_arity: usize,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_new_features: 1000,
            max_candidates_considered: 1_000_000,
            max_product_arity: 8,
        }
    }
}

/// Outcome of one [`FeatureExploration::explore`] call.
#[derive(Debug, Clone, Default)]
pub struct ExplorationReport {
    /// Count of newly interned product features this round.
    pub features_added: u32,
    /// Count of candidates popped off the heap, added or not.
    pub candidates_considered: u32,
    /// Candidates that named a product already interned, or one that
    /// exceeded `Limits::max_product_arity`.
    pub features_skipped: u32,
    /// New dependees edges registered for the added features.
    pub new_edges: Vec<DependeeEdge>,
    /// Running estimate of rows gained per newly added candidate feature,
    /// used by callers that want to budget rounds by expected row growth.
    pub xjbools_per_candidate_feature: f64,
}

#[derive(Debug, Clone, Copy)]
struct PairCandidate {
    sum: f64,
    row_idx: usize,
    pos: usize,
    j1: J,
    j2: J,
}

impl PartialEq for PairCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.sum == other.sum && self.j1 == other.j1 && self.j2 == other.j2
    }
}
impl Eq for PairCandidate {}

impl PartialOrd for PairCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PairCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Sum descending first; on a tie, the lexicographically smaller
        // (j1, j2) pair must pop first, so it compares as the greater
        // candidate in this max-heap.
        self.sum
            .total_cmp(&other.sum)
            .then_with(|| other.j1.cmp(&self.j1))
            .then_with(|| other.j2.cmp(&self.j2))
    }
}

/// Per-row rank sequences plus the rolling candidate-yield estimate
/// carried between rounds.
#[derive(Debug, Clone, Default)]
pub struct FeatureExploration {
    xjbools_per_candidate_feature: f64,
}

impl FeatureExploration {
    /// A fresh explorer with no prior round history.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current running estimate of rows gained per added feature.
    pub fn xjbools_per_candidate_feature(&self) -> f64 {
        self.xjbools_per_candidate_feature
    }

    /// Resolve `j`'s factor set: its registered product if `j` is a
    /// product J, otherwise `j` treated as a 1-factor atomic product.
    fn resolve_factors(j: J, product_map: &ProductMap) -> JProduct {
        match product_map.j_to_key(j) {
            Some(product) => (*product).clone(),
            None => JProduct::atomic(j),
        }
    }

    /// Run one exploration round: rank each row's `J`'s by `scores`, seed
    /// the merge heap, and pop candidates until a stopping condition is
    /// hit. Newly interned products are registered with `product_map` and
    /// their dependees edges spliced into `dependees`.
    pub fn explore(
        &mut self,
        scores: &[f64],
        shard_set: &ShardSet,
        stats: &Stats,
        product_map: &ProductMap,
        dependees: &mut Dependees,
        config: &ExplorationConfig,
    ) -> Result<ExplorationReport> {
        product_map.sync_j_to_key();

        let mut ranked_rows: Vec<Vec<J>> = Vec::new();
        for shard in shard_set.shards() {
            for (_, row, _, _, _) in shard.iter() {
                if row.len() < 2 {
                    continue;
                }
                let mut ranked: Vec<J> = row.to_vec();
                ranked.sort_by(|&a, &b| {
                    let sa = scores.get(a as usize).copied().unwrap_or(0.0);
                    let sb = scores.get(b as usize).copied().unwrap_or(0.0);
                    sb.total_cmp(&sa).then_with(|| a.cmp(&b))
                });
                ranked_rows.push(ranked);
            }
        }

        let score_of = |j: J| scores.get(j as usize).copied().unwrap_or(0.0);

        let mut heap: BinaryHeap<PairCandidate> = BinaryHeap::with_capacity(ranked_rows.len());
        for (row_idx, ranked) in ranked_rows.iter().enumerate() {
            let j1 = ranked[0];
            let j2 = ranked[1];
            heap.push(PairCandidate {
                sum: score_of(j1) + score_of(j2),
                row_idx,
                pos: 0,
                j1,
                j2,
            });
        }

        let mut report = ExplorationReport::default();
        let mut seen_this_round: rustc_hash::FxHashSet<JProduct> = rustc_hash::FxHashSet::default();
        let mut highest_j: J = dependees.row_count();

        while let Some(candidate) = heap.pop() {
            if report.candidates_considered >= config.max_candidates_considered
                || report.features_added >= config.max_new_features
            {
                break;
            }
            report.candidates_considered += 1;

            let ranked = &ranked_rows[candidate.row_idx];
            if candidate.pos + 2 < ranked.len() {
                let next_j1 = ranked[candidate.pos + 1];
                let next_j2 = ranked[candidate.pos + 2];
                heap.push(PairCandidate {
                    sum: score_of(next_j1) + score_of(next_j2),
                    row_idx: candidate.row_idx,
                    pos: candidate.pos + 1,
                    j1: next_j1,
                    j2: next_j2,
                });
            }

            let factors_a = Self::resolve_factors(candidate.j1, product_map);
            let factors_b = Self::resolve_factors(candidate.j2, product_map);
            let product = JProduct::union(&factors_a, &factors_b);

            if product.arity() > config.max_product_arity
                || product_map.contains(&product)
                || !seen_this_round.insert(product.clone())
            {
                report.features_skipped += 1;
                continue;
            }

            let new_j = product_map.intern(product.clone())?;
            highest_j = highest_j.max(new_j + 1);
            let arity = product.arity() as u32;
            for &factor in product.factors() {
                report.new_edges.push(DependeeEdge {
                    parent: factor,
                    child: new_j,
                    child_arity: arity,
                });
            }

            let yield_estimate =
                stats.rows_with_j(candidate.j1).min(stats.rows_with_j(candidate.j2)) as f64;
            report.features_added += 1;
            self.xjbools_per_candidate_feature = if report.features_added == 1 {
                yield_estimate
            } else {
                self.xjbools_per_candidate_feature
                    + (yield_estimate - self.xjbools_per_candidate_feature)
                        / report.features_added as f64
            };
        }

        if report.features_added == 0 {
            self.xjbools_per_candidate_feature *= 0.5;
        }
        report.xjbools_per_candidate_feature = self.xjbools_per_candidate_feature;

        if !report.new_edges.is_empty() {
            dependees.add_edges(&report.new_edges, highest_j);
        }

        tracing::info!(
            features_added = report.features_added,
            candidates_considered = report.candidates_considered,
            features_skipped = report.features_skipped,
            "exploration round complete"
        );

        Ok(report)
    }
}

//! Score-ordered feature pruning with dependee-respecting deferral
//! respecting the dependees graph.
//!
//! Candidates are visited lowest-score first via a min-heap. A J whose
//! dependees graph still lists a live child product cannot be removed
//! yet — removing the factor out from under a still-live product would
//! break the row extender's arity accounting — so it is deferred into a
//! `waiting` queue keyed by that child and revisited once the child is
//! itself removed.

use crate::error::{Error, Result};
use lre_core::J;
use lre_concurrency::Renumbering;
use lre_storage::Dependees;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// At least one of these must be set ("at least one
/// stopping condition required"). All that are set are OR-combined: the
/// first one satisfied halts pruning.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PruningConfig {
    /// Stop once the lowest remaining score is at or above this threshold.
    pub score_threshold: Option<f64>,
    /// Stop once at most this many J's remain.
    pub top_count: Option<u32>,
    /// Stop once at most this fraction of the original J's remain.
    pub top_fraction: Option<f64>,
}

impl PruningConfig {
    /// Reject a config with no stopping condition at all.
    pub fn validate(&self) -> Result<()> {
        if self.score_threshold.is_none() && self.top_count.is_none() && self.top_fraction.is_none()
        {
            return Err(Error::NoStoppingCondition);
        }
        Ok(())
    }
}

/// Outcome of one [`FeaturePruning::prune`] call.
#[derive(Debug, Clone)]
pub struct PruningReport {
    /// J's removed this round.
    pub removed_count: u32,
    /// J's that remained live when a stopping condition was hit.
    pub remaining_count: u32,
    /// Total non-zero row entries freed by the removed J's.
    pub nnz_removed: u64,
    /// The compaction map to apply to every dependent component.
    pub renumbering: Renumbering,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    score: f64,
    j: J,
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the lowest score first.
        other.score.total_cmp(&self.score).then_with(|| other.j.cmp(&self.j))
    }
}

/// Stateless pruning driver; all state lives in the arguments and the
/// returned [`PruningReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePruning;

impl FeaturePruning {
    /// A new pruning driver.
    pub fn new() -> Self {
        Self
    }

    /// Remove J's lowest-score-first, respecting the dependees DAG, until
    /// one of `config`'s stopping conditions fires.
    ///
    /// `rows_with_j` supplies each J's occurrence count (for `nnz_removed`
    /// bookkeeping); `dependees` is read only, never mutated — callers
    /// apply the returned [`Renumbering`] to the dependees graph (and
    /// every other component) through their own choke point.
    pub fn prune(
        &self,
        scores: &[f64],
        dependees: &Dependees,
        rows_with_j: impl Fn(J) -> u32,
        config: &PruningConfig,
    ) -> Result<PruningReport> {
        config.validate()?;

        let j_size = scores.len() as u32;
        let mut heap: BinaryHeap<HeapEntry> = scores
            .iter()
            .enumerate()
            .map(|(j, &score)| HeapEntry { score, j: j as J })
            .collect();

        let mut removed = vec![false; j_size as usize];
        let mut waiting: FxHashMap<J, Vec<J>> = FxHashMap::default();
        let mut removed_count: u32 = 0;
        let mut nnz_removed: u64 = 0;
        let total = j_size;

        while let Some(entry) = heap.pop() {
            let remaining = total - removed_count;

            if let Some(threshold) = config.score_threshold {
                if entry.score >= threshold {
                    break;
                }
            }
            if let Some(top_count) = config.top_count {
                if remaining <= top_count {
                    break;
                }
            }
            if let Some(top_fraction) = config.top_fraction {
                if total > 0 && (remaining as f64 / total as f64) <= top_fraction {
                    break;
                }
            }

            if removed[entry.j as usize] {
                continue;
            }

            let has_live_child = dependees
                .children_of(entry.j)
                .iter()
                .any(|&child| !removed[child as usize]);

            if has_live_child {
                let blocking_child = dependees
                    .children_of(entry.j)
                    .iter()
                    .copied()
                    .find(|&child| !removed[child as usize])
                    .expect("has_live_child guarantees at least one");
                waiting.entry(blocking_child).or_default().push(entry.j);
                continue;
            }

            removed[entry.j as usize] = true;
            removed_count += 1;
            nnz_removed += rows_with_j(entry.j) as u64;

            if let Some(unblocked) = waiting.remove(&entry.j) {
                for parent in unblocked {
                    heap.push(HeapEntry {
                        score: scores[parent as usize],
                        j: parent,
                    });
                }
            }
        }

        let renumbering = Renumbering::from_removed(j_size, &removed)?;

        tracing::info!(
            removed_count,
            remaining_count = total - removed_count,
            nnz_removed,
            "pruning round complete"
        );

        Ok(PruningReport {
            removed_count,
            remaining_count: total - removed_count,
            nnz_removed,
            renumbering,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lre_storage::DependeeEdge;

    fn build_dependees() -> Dependees {
        // atomic 0,1 -> product 2
        let mut d = Dependees::new(3);
        d.add_edges(
            &[
                DependeeEdge { parent: 0, child: 2, child_arity: 2 },
                DependeeEdge { parent: 1, child: 2, child_arity: 2 },
            ],
            3,
        );
        d
    }

    #[test]
    fn rejects_config_with_no_stopping_condition() {
        let config = PruningConfig::default();
        let dependees = Dependees::new(1);
        let pruning = FeaturePruning::new();
        let result = pruning.prune(&[1.0], &dependees, |_| 0, &config);
        assert!(result.is_err());
    }

    #[test]
    fn defers_removal_of_a_parent_with_a_live_child() {
        let dependees = build_dependees();
        let scores = vec![0.1, 10.0, 5.0]; // J0 is lowest, but J2 depends on it
        let config = PruningConfig {
            top_count: Some(1),
            ..PruningConfig::default()
        };
        let pruning = FeaturePruning::new();
        let report = pruning.prune(&scores, &dependees, |_| 1, &config).unwrap();

        // Only one survivor allowed; the product (J2) must go before its
        // factor (J0) can, so removal order is J2, then J0, stopping once
        // J1 is the lone survivor.
        assert_eq!(report.remaining_count, 1);
        assert!(report.renumbering.survives(1));
        assert!(!report.renumbering.survives(2));
    }

    #[test]
    fn score_threshold_stops_pruning_early() {
        let dependees = Dependees::new(2);
        let scores = vec![0.0, 100.0];
        let config = PruningConfig {
            score_threshold: Some(50.0),
            ..PruningConfig::default()
        };
        let pruning = FeaturePruning::new();
        let report = pruning.prune(&scores, &dependees, |_| 1, &config).unwrap();
        assert_eq!(report.removed_count, 1);
        assert!(report.renumbering.survives(1));
    }
}

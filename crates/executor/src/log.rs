//! Domain log records (one of iteration/exploration/pruning/
//! model/grad-boost-update/sgd/command/data-score per line) and the
//! queue-plus-writer-thread plumbing that drains them onto a [`LogSink`].
//!
//! Concrete sinks (an append-only serialized-record file, an append-only
//! structured-text file) are a collaborator's concern — this crate ships
//! only an in-memory [`VecSink`] (for tests and embedding) and a
//! [`TracingSink`] that forwards every record through `tracing`.

use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::thread::JoinHandle;

use lre_engine::{EvaluationMetrics, IterationLog, SgdPassLog};
use lre_explore::{ExplorationReport, PruningReport};

/// One typed domain log line, tagged by kind for the structured-text and
/// serialized-record encodings a collaborator writes to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum LogRecord {
    /// One `GradBoost::run_iteration` report.
    Iteration {
        /// Training rows processed.
        training_rows: u64,
        /// Holdout rows processed, if a holdout shard set was supplied.
        holdout_rows: Option<u64>,
        /// Total loss before this iteration's update.
        total_loss: f64,
        /// Log-loss component of `total_loss`.
        log_loss: f64,
        /// Regularization-loss component of `total_loss`.
        regularization_loss: f64,
        /// Holdout log loss, if a holdout shard set was supplied.
        holdout_log_loss: Option<f64>,
        /// Sum of absolute weights after the update.
        weight_l1: f64,
        /// Sum of squared weights after the update.
        weight_l2: f64,
        /// Count of non-zero weights after the update.
        nonzero_weights: usize,
        /// `true` if the inertia restart rule fired.
        reverted_by_inertia: bool,
        /// `true` if the undo rule reverted this iteration.
        reverted_by_undo: bool,
        /// Area under the ROC curve, if an evaluator was configured.
        auc: Option<f64>,
        /// Lift at the configured fraction, if an evaluator was configured.
        lift: Option<f64>,
    },
    /// One `FeatureExploration::explore` report.
    Exploration {
        /// New product features interned this round.
        features_added: u32,
        /// Candidates popped off the priority heap, added or not.
        candidates_considered: u32,
        /// Candidates skipped (already interned, or over max arity).
        features_skipped: u32,
        /// Running per-round estimate of rows gained per added feature.
        xjbools_per_candidate_feature: f64,
    },
    /// One `FeaturePruning::prune` report.
    Pruning {
        /// J's removed this round.
        removed_count: u32,
        /// J's remaining once a stopping condition fired.
        remaining_count: u32,
        /// Non-zero row entries freed by the removed J's.
        nnz_removed: u64,
    },
    /// A model read/write boundary crossing.
    Model {
        /// `true` for a write, `false` for a read.
        written: bool,
        /// Records transferred (non-zero-weight features).
        record_count: usize,
    },
    /// One `Majorizer::coordinate_update` application, logged separately
    /// from the owning `Iteration` record so a caller that only wants the
    /// raw update outcome doesn't have to parse the full iteration report.
    GradBoostUpdate {
        /// J's covered by the update.
        j_size: u32,
        /// `true` if the inertia restart rule fired.
        reverted_by_inertia: bool,
        /// `true` if the undo rule reverted this iteration.
        reverted_by_undo: bool,
    },
    /// One `Sgd::run_pass` report.
    Sgd {
        /// Rows processed this pass.
        rows_processed: u64,
        /// Learning rate in effect at the end of the pass.
        ending_learning_rate: f64,
    },
    /// A `World::run_command` dispatch, logged before execution.
    Command {
        /// A short, human-readable description of the command.
        description: String,
    },
    /// A `score_rows` pass.
    DataScore {
        /// Rows scored.
        rows_scored: u64,
    },
}

impl LogRecord {
    /// Build an [`LogRecord::Iteration`] from a [`GradBoost`](lre_engine::GradBoost)
    /// iteration report, folding in evaluator metrics if present.
    pub fn from_iteration(log: &IterationLog) -> Self {
        let (auc, lift) = match &log.training_metrics {
            Some(EvaluationMetrics { auc, lift }) => (Some(*auc), Some(*lift)),
            None => (None, None),
        };
        LogRecord::Iteration {
            training_rows: log.training_rows,
            holdout_rows: log.holdout_rows,
            total_loss: log.total_loss,
            log_loss: log.log_loss,
            regularization_loss: log.regularization_loss,
            holdout_log_loss: log.holdout_log_loss,
            weight_l1: log.weight_l1,
            weight_l2: log.weight_l2,
            nonzero_weights: log.nonzero_weights,
            reverted_by_inertia: log.reverted_by_inertia,
            reverted_by_undo: log.reverted_by_undo,
            auc,
            lift,
        }
    }

    /// Build a [`LogRecord::GradBoostUpdate`] from the same iteration report.
    pub fn from_gradboost_update(j_size: u32, log: &IterationLog) -> Self {
        LogRecord::GradBoostUpdate {
            j_size,
            reverted_by_inertia: log.reverted_by_inertia,
            reverted_by_undo: log.reverted_by_undo,
        }
    }

    /// Build a [`LogRecord::Exploration`] from an exploration report.
    pub fn from_exploration(report: &ExplorationReport) -> Self {
        LogRecord::Exploration {
            features_added: report.features_added,
            candidates_considered: report.candidates_considered,
            features_skipped: report.features_skipped,
            xjbools_per_candidate_feature: report.xjbools_per_candidate_feature,
        }
    }

    /// Build a [`LogRecord::Pruning`] from a pruning report.
    pub fn from_pruning(report: &PruningReport) -> Self {
        LogRecord::Pruning {
            removed_count: report.removed_count,
            remaining_count: report.remaining_count,
            nnz_removed: report.nnz_removed,
        }
    }

    /// Build a [`LogRecord::Sgd`] from an SGD pass report.
    pub fn from_sgd_pass(log: &SgdPassLog) -> Self {
        LogRecord::Sgd {
            rows_processed: log.rows_processed,
            ending_learning_rate: log.ending_learning_rate,
        }
    }
}

/// A destination for drained [`LogRecord`]s. Concrete file-backed sinks
/// (the serialized-record stream, the structured-text stream) are a
/// collaborator's concern; this crate ships [`VecSink`] and [`TracingSink`].
pub trait LogSink: Send {
    /// Consume one record.
    fn write(&mut self, record: &LogRecord);
}

/// An in-memory sink that retains every record, for tests and for
/// embedding this engine where the caller wants records in process rather
/// than on disk.
#[derive(Clone, Default)]
pub struct VecSink {
    records: std::sync::Arc<parking_lot::Mutex<Vec<LogRecord>>>,
}

impl VecSink {
    /// A fresh, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every record written so far, in order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }
}

impl LogSink for VecSink {
    fn write(&mut self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Forwards every record through `tracing::info!`, the "ambient"
/// structured-logging path every crate in this workspace carries
/// regardless of whether a domain-log file sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&mut self, record: &LogRecord) {
        tracing::info!(?record, "domain log record");
    }
}

/// A cloneable handle used to enqueue [`LogRecord`]s onto a [`LogWriter`]'s
/// drain thread.
#[derive(Clone)]
pub struct LogSender {
    tx: mpsc::Sender<LogRecord>,
}

impl LogSender {
    /// Enqueue one record. Never blocks; the channel is unbounded, since
    /// domain log volume is one record per command/iteration/pass, far
    /// below a rate that would need backpressure.
    pub fn send(&self, record: LogRecord) {
        // A closed receiver only happens after `LogWriter::shutdown`, at
        // which point dropped records are the caller's problem for
        // continuing to log past shutdown.
        let _ = self.tx.send(record);
    }
}

/// Drains queued [`LogRecord`]s onto a fixed list of [`LogSink`]s from a
/// dedicated writer thread, following the same worker-thread
/// drain-queue pattern as [`crate::world`]'s other background work, but
/// simplified to the single always-FIFO queue domain logging needs.
pub struct LogWriter {
    tx: mpsc::Sender<LogRecord>,
    handle: Option<JoinHandle<()>>,
}

impl LogWriter {
    /// Spawn the drain thread, forwarding every record to every sink in
    /// `sinks`, in order.
    pub fn new(mut sinks: Vec<Box<dyn LogSink>>) -> Self {
        let (tx, rx) = mpsc::channel::<LogRecord>();
        let handle = std::thread::Builder::new()
            .name("lrengine-log-writer".to_string())
            .spawn(move || {
                while let Ok(record) = rx.recv() {
                    for sink in &mut sinks {
                        sink.write(&record);
                    }
                }
            })
            .expect("failed to spawn log writer thread");
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// A cloneable sender for enqueuing records from any thread.
    pub fn sender(&self) -> LogSender {
        LogSender {
            tx: self.tx.clone(),
        }
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        // Dropping `self.tx` closes the channel once every clone handed
        // out by `sender()` is also dropped; the writer thread's `recv()`
        // loop then ends on its own. We still join here so that a
        // `LogWriter` going out of scope guarantees every already-queued
        // record has been drained before the process moves on.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_every_record_in_order() {
        let sink = VecSink::new();
        let writer = LogWriter::new(vec![Box::new(sink.clone())]);
        let sender = writer.sender();
        for i in 0..50u64 {
            sender.send(LogRecord::DataScore { rows_scored: i });
        }
        drop(sender);
        drop(writer);

        let records = sink.records();
        assert_eq!(records.len(), 50);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record, &LogRecord::DataScore { rows_scored: i as u64 });
        }
    }

    #[test]
    fn fans_out_to_every_sink() {
        let a = VecSink::new();
        let b = VecSink::new();
        let writer = LogWriter::new(vec![Box::new(a.clone()), Box::new(b.clone())]);
        writer.sender().send(LogRecord::Command {
            description: "test".to_string(),
        });
        drop(writer);

        assert_eq!(a.records().len(), 1);
        assert_eq!(b.records().len(), 1);
    }
}

//! Boundary traits for the external collaborators this crate treats as
//! out of scope: the LIBSVM-style data reader, the model file reader/
//! writer, the score-output writer, and the command-script source.
//!
//! This crate ships only in-memory implementations of each trait, for
//! tests and for embedding the engine directly. Disk-backed
//! implementations (the serialized-record model stream, the
//! structured-text model form, LIBSVM parsing) are a collaborator's job.

use lre_core::{Label, RowId};

/// One raw training row as a collaborator (a LIBSVM-format reader, say)
/// would hand it to [`crate::world::World::read_data`]: atomic feature
/// names rather than interned J's, since interning is the world's job.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Atomic feature names present in this row.
    pub features: Vec<String>,
    /// The row's label.
    pub label: Label,
    /// A unique row id. `read_data` assigns a sequential id if `None`.
    pub row_id: Option<RowId>,
    /// An optional opaque user id carried through to score output.
    pub user_id: Option<u64>,
}

/// A source of raw training rows. `next_row` returning `None` signals
/// end of input.
pub trait RowSource: Send {
    /// Pull the next row, or `None` at end of input.
    fn next_row(&mut self) -> Option<RawRow>;
}

/// An in-memory [`RowSource`] backed by a `Vec`, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    rows: std::collections::VecDeque<RawRow>,
}

impl VecRowSource {
    /// Wrap `rows` for sequential consumption.
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows: rows.into(),
        }
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Option<RawRow> {
        self.rows.pop_front()
    }
}

/// One non-zero model record: the ordered atomic feature names making up
/// a JProduct (empty for the bias term) and its weight. Zero-weight
/// features are never emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    /// Atomic factor names, in JProduct order. Empty for the bias term.
    pub features: Vec<String>,
    /// The feature's weight. Always finite.
    pub weight: f64,
}

/// A destination for a model's non-zero weights.
pub trait ModelSink: Send {
    /// Receive the complete set of records for one model write.
    fn write_model(&mut self, records: Vec<ModelRecord>);
}

/// A source of a previously written model's records.
pub trait ModelSource: Send {
    /// Produce the records to load.
    fn read_model(&mut self) -> Vec<ModelRecord>;
}

/// An in-memory model sink/source, for tests and embedding. Doubles as
/// both trait so a round trip can be expressed without a real disk file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelStore {
    records: Vec<ModelRecord>,
}

impl InMemoryModelStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the records currently held, without consuming them.
    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }
}

impl ModelSink for InMemoryModelStore {
    fn write_model(&mut self, records: Vec<ModelRecord>) {
        self.records = records;
    }
}

impl ModelSource for InMemoryModelStore {
    fn read_model(&mut self) -> Vec<ModelRecord> {
        self.records.clone()
    }
}

/// One scored row, as emitted by `score_rows`: `(row_id, w·x)` per row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredRow {
    /// The row's id.
    pub row_id: RowId,
    /// `w · x` over the row's extended feature set.
    pub score: f64,
}

/// A destination for scored rows.
pub trait ScoreSink: Send {
    /// Receive one row's score. Called once per scored row, in row order.
    fn write_score(&mut self, scored: ScoredRow);
}

/// An in-memory score sink, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct VecScoreSink {
    scores: Vec<ScoredRow>,
}

impl VecScoreSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every score written so far, in order.
    pub fn scores(&self) -> &[ScoredRow] {
        &self.scores
    }
}

impl ScoreSink for VecScoreSink {
    fn write_score(&mut self, scored: ScoredRow) {
        self.scores.push(scored);
    }
}

/// A source of additional commands, used by the `from_file` command to
/// splice a sub-script into the running command stream. Parsing the
/// structured command script itself is a collaborator's job; this trait
/// only asks for the already-parsed result.
pub trait CommandSource: Send {
    /// Load the commands named by `path` (a collaborator-defined handle,
    /// e.g. a file path or logical script name).
    fn load(&mut self, path: &str) -> Vec<crate::command::Command>;
}

/// An in-memory [`CommandSource`] keyed by name, for tests and embedding.
#[derive(Default)]
pub struct MapCommandSource {
    scripts: std::collections::HashMap<String, Vec<crate::command::Command>>,
}

impl MapCommandSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the commands `from_file(name)` should resolve to.
    pub fn insert(&mut self, name: impl Into<String>, commands: Vec<crate::command::Command>) {
        self.scripts.insert(name.into(), commands);
    }
}

impl CommandSource for MapCommandSource {
    fn load(&mut self, path: &str) -> Vec<crate::command::Command> {
        self.scripts.get(path).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn vec_row_source_yields_rows_in_order_then_ends() {
        let mut source = VecRowSource::new(vec![
            RawRow {
                features: vec!["a".to_string()],
                label: Label::Positive,
                row_id: None,
                user_id: None,
            },
            RawRow {
                features: vec![],
                label: Label::Negative,
                row_id: Some(7),
                user_id: None,
            },
        ]);
        assert!(source.next_row().is_some());
        assert!(source.next_row().is_some());
        assert!(source.next_row().is_none());
    }

    #[test]
    fn in_memory_model_store_round_trips() {
        let mut store = InMemoryModelStore::new();
        let records = vec![ModelRecord {
            features: vec!["a".to_string(), "b".to_string()],
            weight: 0.5,
        }];
        store.write_model(records.clone());
        assert_eq!(store.read_model(), records);
    }

    #[test]
    fn map_command_source_resolves_registered_scripts() {
        let mut source = MapCommandSource::new();
        source.insert("warmup", vec![Command::InitializeBias]);
        assert_eq!(source.load("warmup"), vec![Command::InitializeBias]);
        assert!(source.load("missing").is_empty());
    }
}

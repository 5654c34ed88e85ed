//! The `World` aggregate: the single owner of every structural component
//! and the single choke point through which feature-universe growth and
//! pruning route.
//!
//! `World::run_command` is the only entry point a collaborator (a command
//! script interpreter, an embedding application) needs: every other method
//! on `World` exists to implement one `Command` variant or to let tests
//! inspect state directly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use lre_concurrency::{FeatureMap, ProductMap, Renumbering};
use lre_core::{FeatureName, J, JProduct, Label, Limits, RowId};
use lre_engine::{
    GradBoost, GradBoostConfig, MajorizerPool, Regularizations, Sgd, SgdConfig, TrainingMode,
};
use lre_explore::{compute_scores, ExplorationConfig, FeatureExploration, FeaturePruning,
    PruningConfig, ScoreShaping, ScoreStrategy};
use lre_storage::{recalc_stats, DependeeEdge, Dependees, RowExtender, ShardSet, Stats};
use lre_engine::Model;

use crate::boundary::{
    CommandSource, ModelRecord, ModelSink, ModelSource, RawRow, RowSource, ScoreSink, ScoredRow,
};
use crate::command::{Command, SetOption, SgdSubcommand};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::log::{LogRecord, LogSender};

/// The aggregate owning every structural component: the feature universe,
/// the training (and optional holdout) data, per-J statistics, the model,
/// both optimizers, exploration/pruning state, and whichever boundary
/// collaborators a caller has registered.
///
/// All structural mutation (growing the J space, removing and renumbering
/// it) routes through [`World::add_features`] / [`World::remove_and_renumber`],
/// the two choke points that keep every dependent component in sync.
pub struct World {
    config: EngineConfig,
    counter: Arc<AtomicU32>,
    features: FeatureMap,
    products: ProductMap,
    dependees: Dependees,
    training: ShardSet,
    holdout: Option<ShardSet>,
    stats: Stats,
    regularizations: Regularizations,
    model: Model,
    gradboost: GradBoost,
    sgd: Option<Sgd>,
    exploration: FeatureExploration,
    pool: MajorizerPool,
    j_size: u32,
    next_row_id: RowId,

    log_sender: Option<LogSender>,
    row_source: Option<Box<dyn RowSource>>,
    model_sink: Option<Box<dyn ModelSink>>,
    model_source: Option<Box<dyn ModelSource>>,
    score_sink: Option<Box<dyn ScoreSink>>,
    command_source: Option<Box<dyn CommandSource>>,
    evaluator: Option<Box<dyn lre_engine::Evaluator>>,
}

impl World {
    /// A fresh `World` with no data, no features, and every component
    /// sized to zero, tuned by `config`. `config` is validated eagerly.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let counter = Arc::new(AtomicU32::new(0));
        let features = FeatureMap::with_counter(Limits::default(), counter.clone());
        let products = ProductMap::with_counter(Limits::default(), counter.clone());
        let gradboost_config = GradBoostConfig {
            schedule: config.schedule(),
            inertia_factor: config.inertia_factor,
            step_multiplier: config.step_multiplier,
            allow_undo: config.allow_undo,
        };
        let regularizations = config.regularizations;
        let worker_count = config.worker_count;
        let max_shard_size = config.max_shard_size;

        Ok(Self {
            counter,
            features,
            products,
            dependees: Dependees::new(0),
            training: ShardSet::new(max_shard_size),
            holdout: None,
            stats: Stats::new(0),
            regularizations,
            model: Model::new(0),
            gradboost: GradBoost::new(gradboost_config, 0),
            sgd: None,
            exploration: FeatureExploration::new(),
            pool: MajorizerPool::new(worker_count, 0),
            j_size: 0,
            next_row_id: 0,
            log_sender: None,
            row_source: None,
            model_sink: None,
            model_source: None,
            score_sink: None,
            command_source: None,
            evaluator: None,
            config,
        })
    }

    // -- collaborator registration -----------------------------------

    /// Register the row source `read_data` pulls from.
    pub fn set_row_source(&mut self, source: Box<dyn RowSource>) {
        self.row_source = Some(source);
    }

    /// Register the sink `store_model`/`write_model` write to.
    pub fn set_model_sink(&mut self, sink: Box<dyn ModelSink>) {
        self.model_sink = Some(sink);
    }

    /// Register the source `get_model` reads from.
    pub fn set_model_source(&mut self, source: Box<dyn ModelSource>) {
        self.model_source = Some(source);
    }

    /// Register the sink `score_rows` writes to.
    pub fn set_score_sink(&mut self, sink: Box<dyn ScoreSink>) {
        self.score_sink = Some(sink);
    }

    /// Register the source `from_file` resolves sub-scripts against.
    pub fn set_command_source(&mut self, source: Box<dyn CommandSource>) {
        self.command_source = Some(source);
    }

    /// Register the evaluator `fit_model_weights` reports AUC/lift through.
    pub fn set_evaluator(&mut self, evaluator: Box<dyn lre_engine::Evaluator>) {
        self.evaluator = Some(evaluator);
    }

    /// Register the sender every domain [`LogRecord`] is enqueued onto.
    pub fn set_log_sender(&mut self, sender: LogSender) {
        self.log_sender = Some(sender);
    }

    fn log(&self, record: LogRecord) {
        if let Some(sender) = &self.log_sender {
            sender.send(record);
        }
    }

    // -- introspection, mostly for tests and embedding ----------------

    /// The current J-space size.
    pub fn j_size(&self) -> u32 {
        self.j_size
    }

    /// The trained model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The current per-J statistics.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// The training set.
    pub fn training(&self) -> &ShardSet {
        &self.training
    }

    /// The holdout set, if `read_data { into_holdout: true }` has run.
    pub fn holdout(&self) -> Option<&ShardSet> {
        self.holdout.as_ref()
    }

    /// The J assigned to an atomic feature name, if interned.
    pub fn feature_j(&self, name: &str) -> Option<J> {
        self.features.lookup(&FeatureName::new(name))
    }

    // -- the structural choke points -----------------------------------

    /// Grow every dependent component to `new_j_size`: re-sync both
    /// bimaps' dense views, grow the dependees row axis, re-extend every
    /// stored row against the (possibly larger) dependees graph, recompute
    /// `Stats`, and resize the model, `GradBoost`, the majorizer pool, and
    /// `Sgd`'s epoch size. Fixed order: product map sync -> dependees row
    /// count -> stats -> model -> optimizer state.
    fn add_features(&mut self, new_j_size: u32) -> Result<()> {
        if new_j_size <= self.j_size && self.j_size != 0 {
            return Ok(());
        }
        self.features.sync_j_to_key();
        self.products.sync_j_to_key();
        self.dependees.grow_rows(new_j_size);
        self.training.re_extend_all(&self.dependees)?;
        if let Some(holdout) = &mut self.holdout {
            holdout.re_extend_all(&self.dependees)?;
        }
        self.stats = recalc_stats(&self.training, new_j_size, self.config.worker_count);
        self.model.grow(new_j_size);
        self.gradboost.grow(new_j_size);
        self.pool = MajorizerPool::new(self.config.worker_count, new_j_size);
        if let Some(sgd) = &mut self.sgd {
            sgd.set_rows_per_epoch(self.training.row_count() as f64);
        }
        self.j_size = new_j_size;
        Ok(())
    }

    /// Apply `renumbering` to every component that carries J-indexed
    /// state: both bimaps, the dependees graph (both its row axis and its
    /// row contents), the training/holdout shard contents, the model, the
    /// batch optimizer's inertia state, and `Stats` (rebuilt fresh, since
    /// pruning changes which rows contribute to which J).
    fn remove_and_renumber(&mut self, renumbering: &Renumbering) -> Result<()> {
        self.features.renumber(renumbering);
        self.products.renumber(renumbering);
        self.dependees.remove_and_renumber(renumbering);
        self.training.remove_and_renumber_js(renumbering);
        if let Some(holdout) = &mut self.holdout {
            holdout.remove_and_renumber_js(renumbering);
        }
        self.model.remove_and_renumber(renumbering);
        self.gradboost.remove_and_renumber(renumbering);
        self.pool = MajorizerPool::new(self.config.worker_count, renumbering.new_size());
        self.stats = recalc_stats(&self.training, renumbering.new_size(), self.config.worker_count);
        if let Some(sgd) = &mut self.sgd {
            sgd.set_rows_per_epoch(self.training.row_count() as f64);
        }
        self.j_size = renumbering.new_size();
        Ok(())
    }

    /// Recompute `Stats` and the SGD epoch size without growing anything,
    /// e.g. after `read_data` appended rows but interned no new features.
    fn refresh_after_new_rows(&mut self) -> Result<()> {
        self.stats = recalc_stats(&self.training, self.j_size, self.config.worker_count);
        if let Some(sgd) = &mut self.sgd {
            sgd.set_rows_per_epoch(self.training.row_count() as f64);
        }
        Ok(())
    }

    fn bias_j(&self) -> Option<J> {
        self.products.lookup(&JProduct::bias())
    }

    fn resolve_feature_names(&self, j: J) -> Result<Vec<String>> {
        if let Some(name) = self.features.j_to_key(j) {
            return Ok(vec![name.as_str().to_string()]);
        }
        if let Some(product) = self.products.j_to_key(j) {
            let mut names = Vec::with_capacity(product.arity());
            for &factor in product.factors() {
                let name = self
                    .features
                    .j_to_key(factor)
                    .ok_or_else(|| Error::UnknownFeature(factor.to_string()))?;
                names.push(name.as_str().to_string());
            }
            return Ok(names);
        }
        Err(Error::UnknownFeature(j.to_string()))
    }

    // -- command implementations ---------------------------------------

    fn apply_set(&mut self, option: SetOption) -> Result<()> {
        if let Some(logging) = option.logging.clone() {
            self.config.logging = logging;
        }
        self.regularizations = option.apply_regularizations(self.regularizations);
        self.config.regularizations = self.regularizations;
        if let Some(v) = option.inertia_factor {
            self.config.inertia_factor = v;
        }
        if let Some(v) = option.step_multiplier {
            self.config.step_multiplier = v;
        }
        if let Some(v) = option.allow_undo {
            self.config.allow_undo = v;
        }
        if let Some(v) = option.deterministic {
            self.config.deterministic = v;
        }
        if let Some(v) = option.max_shard_size {
            self.config.max_shard_size = v;
            self.training.set_max_shard_size(v);
            if let Some(holdout) = &mut self.holdout {
                holdout.set_max_shard_size(v);
            }
        }
        if let Some(v) = option.logged_lift_fraction {
            self.config.logged_lift_fraction = v;
        }
        if let Some(schedule) = option.sgd_learning_rate_schedule {
            self.config.sgd_learning_rate_schedule = schedule;
            if let Some(sgd) = &mut self.sgd {
                sgd.set_learning_rate(schedule.resolve(self.training.row_count().max(1) as f64));
            }
        }
        self.config.validate()?;
        self.gradboost.set_config(GradBoostConfig {
            schedule: self.config.schedule(),
            inertia_factor: self.config.inertia_factor,
            step_multiplier: self.config.step_multiplier,
            allow_undo: self.config.allow_undo,
        });
        Ok(())
    }

    fn read_data(&mut self, into_holdout: bool) -> Result<()> {
        let mut source = self
            .row_source
            .take()
            .ok_or_else(|| Error::Configuration("no RowSource registered".to_string()))?;

        while let Some(raw) = source.next_row() {
            self.append_raw_row(raw, into_holdout)?;
        }
        self.row_source = Some(source);

        let new_j_size = self.counter.load(Ordering::Relaxed);
        if new_j_size > self.j_size {
            self.add_features(new_j_size)?;
        } else {
            self.refresh_after_new_rows()?;
        }
        Ok(())
    }

    fn append_raw_row(&mut self, raw: RawRow, into_holdout: bool) -> Result<()> {
        let RawRow {
            features,
            label,
            row_id,
            user_id,
        } = raw;

        let mut js: Vec<J> = features
            .into_iter()
            .map(|name| self.features.intern(FeatureName::new(name)))
            .collect::<lre_concurrency::Result<Vec<J>>>()?;
        if let Some(bias_j) = self.bias_j() {
            js.push(bias_j);
        }
        js.sort_unstable();
        js.dedup();

        let extended = RowExtender::extend(&js, &self.dependees);
        let row_id = row_id.unwrap_or_else(|| {
            let id = self.next_row_id;
            self.next_row_id += 1;
            id
        });

        let target = if into_holdout {
            self.holdout
                .get_or_insert_with(|| ShardSet::new(self.config.max_shard_size))
        } else {
            &mut self.training
        };
        target.append_row(&extended, label, row_id, user_id)?;
        Ok(())
    }

    fn initialize_bias(&mut self) -> Result<()> {
        self.products.intern(JProduct::bias())?;
        let new_j_size = self.counter.load(Ordering::Relaxed);
        if new_j_size > self.j_size {
            self.add_features(new_j_size)?;
        }
        Ok(())
    }

    fn add_new_product_features(
        &mut self,
        strategy: ScoreStrategy,
        shaping: ScoreShaping,
        config: ExplorationConfig,
    ) -> Result<()> {
        let scores = compute_scores(&self.model, &self.stats, self.j_size, strategy, &shaping);
        let report = self.exploration.explore(
            &scores,
            &self.training,
            &self.stats,
            &self.products,
            &mut self.dependees,
            &config,
        )?;
        self.log(LogRecord::from_exploration(&report));
        if report.features_added > 0 {
            let new_j_size = self.counter.load(Ordering::Relaxed);
            self.add_features(new_j_size)?;
        }
        Ok(())
    }

    fn prune_features(
        &mut self,
        strategy: ScoreStrategy,
        shaping: ScoreShaping,
        config: PruningConfig,
    ) -> Result<()> {
        let scores = compute_scores(&self.model, &self.stats, self.j_size, strategy, &shaping);
        let pruning = FeaturePruning::new();
        let report = pruning.prune(
            &scores,
            &self.dependees,
            |j| self.stats.rows_with_j(j),
            &config,
        )?;
        self.log(LogRecord::from_pruning(&report));
        self.remove_and_renumber(&report.renumbering)
    }

    fn fit_model_weights(&mut self, iterations: u32) -> Result<()> {
        for _ in 0..iterations {
            let log = self.gradboost.run_iteration(
                &self.model,
                &self.training,
                self.holdout.as_ref(),
                &self.stats,
                &self.regularizations,
                &self.pool,
                self.evaluator.as_deref(),
            );
            self.log(LogRecord::from_gradboost_update(self.model.len(), &log));
            self.log(LogRecord::from_iteration(&log));
        }
        Ok(())
    }

    fn ensure_sgd(&mut self, mode: TrainingMode) -> Result<()> {
        if !self.regularizations.is_standard() {
            return Err(lre_engine::Error::NonStandardRegularizationForSgd.into());
        }
        if self.sgd.is_none() {
            let sgd_config = SgdConfig {
                schedule: self.config.schedule(),
                learning_rate: self
                    .config
                    .sgd_learning_rate_schedule
                    .resolve(self.training.row_count().max(1) as f64),
                mode,
            };
            self.sgd = Some(Sgd::new(sgd_config, &self.regularizations)?);
        }
        let sgd = self.sgd.as_mut().expect("just constructed above");
        sgd.configure(self.config.schedule(), mode);
        Ok(())
    }

    fn run_sgd(&mut self, iterations: u32, mode: TrainingMode) -> Result<()> {
        self.ensure_sgd(mode)?;
        let sgd = self.sgd.as_mut().expect("ensure_sgd just constructed it");
        for _ in 0..iterations {
            let log = sgd.run_pass(&self.model, &self.training, &self.regularizations);
            self.log(LogRecord::from_sgd_pass(&log));
        }
        Ok(())
    }

    fn sgd_subcommand(&mut self, subcommand: SgdSubcommand) -> Result<()> {
        let total_loss = self.gradboost.total_loss(
            &self.model,
            &self.training,
            &self.stats,
            &self.regularizations,
            &self.pool,
        );
        let sgd = self.sgd.as_mut().ok_or(Error::SgdNotInitialized)?;
        match subcommand {
            SgdSubcommand::StoreTotalLoss => {
                sgd.store_total_loss(total_loss);
            }
            SgdSubcommand::MaybeReduce { factor } => {
                sgd.maybe_reduce(total_loss, factor)?;
            }
        }
        Ok(())
    }

    fn evaluate_stats(&mut self) -> Result<()> {
        self.stats = recalc_stats(&self.training, self.j_size, self.config.worker_count);
        Ok(())
    }

    fn write_model(&mut self) -> Result<()> {
        self.features.sync_j_to_key();
        self.products.sync_j_to_key();

        let mut records = Vec::new();
        for j in 0..self.j_size {
            let weight = self.model.get(j);
            if weight == 0.0 {
                continue;
            }
            let features = self.resolve_feature_names(j)?;
            records.push(ModelRecord { features, weight });
        }

        let record_count = records.len();
        let sink = self
            .model_sink
            .as_mut()
            .ok_or_else(|| Error::Configuration("no ModelSink registered".to_string()))?;
        sink.write_model(records);
        self.log(LogRecord::Model {
            written: true,
            record_count,
        });
        Ok(())
    }

    fn get_model(&mut self) -> Result<()> {
        let mut source = self
            .model_source
            .take()
            .ok_or_else(|| Error::Configuration("no ModelSource registered".to_string()))?;
        let records = source.read_model();
        self.model_source = Some(source);

        let mut new_edges: Vec<DependeeEdge> = Vec::new();
        let mut loaded: Vec<(J, f64)> = Vec::with_capacity(records.len());

        for record in &records {
            let atomic_js: Vec<J> = record
                .features
                .iter()
                .map(|name| self.features.intern(FeatureName::new(name.clone())))
                .collect::<lre_concurrency::Result<Vec<J>>>()?;

            let j = match atomic_js.len() {
                0 => self.products.intern(JProduct::bias())?,
                1 => atomic_js[0],
                _ => {
                    let product = JProduct::from_factors(atomic_js);
                    let already_known = self.products.contains(&product);
                    let arity = product.arity() as u32;
                    let factors: Vec<J> = product.factors().to_vec();
                    let j = self.products.intern(product)?;
                    if !already_known {
                        for factor in factors {
                            new_edges.push(DependeeEdge {
                                parent: factor,
                                child: j,
                                child_arity: arity,
                            });
                        }
                    }
                    j
                }
            };
            loaded.push((j, record.weight));
        }

        let new_j_size = self.counter.load(Ordering::Relaxed);
        if !new_edges.is_empty() {
            self.dependees.add_edges(&new_edges, new_j_size);
        }
        if new_j_size > self.j_size {
            self.add_features(new_j_size)?;
        }
        for (j, weight) in loaded {
            self.model.set(j, weight);
        }

        self.log(LogRecord::Model {
            written: false,
            record_count: records.len(),
        });
        Ok(())
    }

    fn score_rows(&mut self) -> Result<()> {
        let sink = self
            .score_sink
            .as_mut()
            .ok_or_else(|| Error::Configuration("no ScoreSink registered".to_string()))?;
        let mut rows_scored: u64 = 0;
        for shard in self.training.shards() {
            for (_, row, _label, row_id, _user_id) in shard.iter() {
                let score: f64 = row.iter().map(|&j| self.model.get(j)).sum();
                sink.write_score(ScoredRow { row_id, score });
                rows_scored += 1;
            }
        }
        self.log(LogRecord::DataScore { rows_scored });
        Ok(())
    }

    fn run_from_file(&mut self, path: String) -> Result<()> {
        let mut source = self
            .command_source
            .take()
            .ok_or_else(|| Error::Configuration("no CommandSource registered".to_string()))?;
        let commands = source.load(&path);
        self.command_source = Some(source);
        for command in commands {
            self.run_command(command)?;
        }
        Ok(())
    }

    /// Dispatch one [`Command`]. Every fallible subcommand bubbles its
    /// error up unchanged; `Repeat`/`CommandList`/`FromFile` stop at the
    /// first failing sub-command rather than continuing past it.
    pub fn run_command(&mut self, command: Command) -> Result<()> {
        self.log(LogRecord::Command {
            description: format!("{command:?}"),
        });
        match command {
            Command::Set(option) => self.apply_set(option),
            Command::ReadData { into_holdout } => self.read_data(into_holdout),
            Command::InitializeBias => self.initialize_bias(),
            Command::AddNewProductFeatures {
                strategy,
                shaping,
                config,
            } => self.add_new_product_features(strategy, shaping, config),
            Command::PruneFeatures {
                strategy,
                shaping,
                config,
            } => self.prune_features(strategy, shaping, config),
            Command::FitModelWeights { iterations } => self.fit_model_weights(iterations),
            Command::RunSgd { iterations, mode } => self.run_sgd(iterations, mode),
            Command::Sgd(subcommand) => self.sgd_subcommand(subcommand),
            Command::EvaluateStats => self.evaluate_stats(),
            Command::StoreModel => self.write_model(),
            Command::WriteModel => self.write_model(),
            Command::GetModel => self.get_model(),
            Command::Repeat { times, command } => {
                for _ in 0..times {
                    self.run_command((*command).clone())?;
                }
                Ok(())
            }
            Command::Internal(_tag) => Ok(()),
            Command::FromFile(path) => self.run_from_file(path),
            Command::CommandList(commands) => {
                for command in commands {
                    self.run_command(command)?;
                }
                Ok(())
            }
            Command::ScoreRows => self.score_rows(),
        }
    }
}

//! Exercises exploration and pruning back to back: new product features
//! proposed from scored data, then low-scoring features removed while
//! respecting the dependees relationships exploration just created.

use lre_concurrency::{FeatureMap, ProductMap};
use lre_core::{FeatureName, Label, Limits};
use lre_engine::Model;
use lre_explore::{ExplorationConfig, FeatureExploration, FeaturePruning, PruningConfig};
use lre_storage::{recalc_stats, Dependees, ShardSet};
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

#[test]
fn exploration_pairs_top_scorers_and_pruning_removes_the_weak_atomic_last() {
    let counter = Arc::new(AtomicU32::new(0));
    let features = FeatureMap::with_counter(Limits::default(), counter.clone());
    let products = ProductMap::with_counter(Limits::default(), counter);

    let strong_a = features.intern(FeatureName::new("strong_a")).unwrap();
    let strong_b = features.intern(FeatureName::new("strong_b")).unwrap();
    let weak = features.intern(FeatureName::new("weak")).unwrap();

    let mut shards = ShardSet::new(10_000);
    for i in 0..30u32 {
        let label = if i % 2 == 0 { Label::Positive } else { Label::Negative };
        shards
            .append_row(&[strong_a, strong_b, weak], label, i, None)
            .unwrap();
    }

    let model = Model::new(3);
    model.set(strong_a, 5.0);
    model.set(strong_b, 4.0);
    model.set(weak, 0.01);

    let stats = recalc_stats(&shards, 3, 2);

    // Exploration proposes strong_a * strong_b as a new product feature.
    let scores = lre_explore::compute_scores(
        &model,
        &stats,
        3,
        lre_explore::ScoreStrategy::AbsWeight,
        &lre_explore::ScoreShaping::none(),
    );
    let mut dependees = Dependees::new(3);
    let mut explorer = FeatureExploration::new();
    let exploration_report = explorer
        .explore(
            &scores,
            &shards,
            &stats,
            &products,
            &mut dependees,
            &ExplorationConfig {
                max_new_features: 1,
                ..ExplorationConfig::default()
            },
        )
        .unwrap();

    assert_eq!(exploration_report.features_added, 1);
    let new_product = products
        .lookup(&lre_core::JProduct::from_factors(vec![strong_a, strong_b]))
        .expect("strong_a * strong_b should have been interned");
    assert!(dependees.children_of(strong_a).contains(&new_product));
    assert!(dependees.children_of(strong_b).contains(&new_product));

    // Pruning now tries to drop the weak atomic first (lowest score) and
    // the two strong atomics last, with the new product having no
    // dependees of its own so it is always immediately removable.
    let j_size = 4u32; // 3 atomics + 1 product
    let mut all_scores = vec![0.0; j_size as usize];
    all_scores[strong_a as usize] = 5.0;
    all_scores[strong_b as usize] = 4.0;
    all_scores[weak as usize] = 0.01;
    all_scores[new_product as usize] = 9.0;

    let pruning = FeaturePruning::new();
    let pruning_report = pruning
        .prune(
            &all_scores,
            &dependees,
            |j| stats.rows_with_j(j.min(2)),
            &PruningConfig {
                top_count: Some(3),
                ..PruningConfig::default()
            },
        )
        .unwrap();

    assert_eq!(pruning_report.remaining_count, 3);
    assert!(!pruning_report.renumbering.survives(weak));
    assert!(pruning_report.renumbering.survives(strong_a));
    assert!(pruning_report.renumbering.survives(strong_b));
    assert!(pruning_report.renumbering.survives(new_product));
}

#[test]
fn pruning_without_a_stopping_condition_is_rejected() {
    let dependees = Dependees::new(1);
    let pruning = FeaturePruning::new();
    let result = pruning.prune(&[1.0], &dependees, |_| 0, &PruningConfig::default());
    assert!(result.is_err());
}

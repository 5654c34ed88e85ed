//! Exercises the row-extension and shard pipeline together: a raw sparse
//! row gets extended against the dependees DAG before it is folded into
//! shard statistics, mirroring how a training pass treats a stored row.

use lre_core::Label;
use lre_storage::{recalc_stats, CooMatrix, Dependees, RowExtender, ShardSet};
use rustc_hash::FxHashMap;

fn two_factor_dependees() -> Dependees {
    let mut coo = CooMatrix::new();
    coo.push(0, 2);
    coo.push(1, 2);
    coo.sort();
    let mut arities = FxHashMap::default();
    arities.insert(2, 2);
    let mut dependees = Dependees::new(2);
    dependees.replace_from_coo(&coo, 2, arities);
    dependees
}

#[test]
fn extended_row_feeds_stats_for_the_product_feature() {
    let dependees = two_factor_dependees();
    let mut shards = ShardSet::new(1000);

    for i in 0..5u32 {
        let raw_row = [0u32, 1u32];
        let extended = RowExtender::extend(&raw_row, &dependees);
        shards
            .append_row(&extended, Label::Positive, i, None)
            .unwrap();
    }

    let stats = recalc_stats(&shards, 3, 2);
    assert_eq!(stats.rows_with_j(2), 5);
    assert_eq!(stats.positive_rows(), 5);
}

#[test]
fn partial_row_does_not_activate_the_product() {
    let dependees = two_factor_dependees();
    let mut shards = ShardSet::new(1000);

    let extended = RowExtender::extend(&[0u32], &dependees);
    shards
        .append_row(&extended, Label::Negative, 0, None)
        .unwrap();

    let stats = recalc_stats(&shards, 3, 1);
    assert_eq!(stats.rows_with_j(2), 0);
    assert_eq!(stats.rows_with_j(0), 1);
}

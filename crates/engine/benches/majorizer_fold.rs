use criterion::{criterion_group, criterion_main, Criterion};
use lre_core::Label;
use lre_engine::Majorizer;

fn toy_row(j_size: u32) -> Vec<u32> {
    (0..j_size).step_by(7).collect()
}

fn bench_accumulate_row(c: &mut Criterion) {
    let j_size = 10_000;
    let row = toy_row(j_size);
    c.bench_function("majorizer_accumulate_row", |b| {
        b.iter(|| {
            let mut majorizer = Majorizer::new(j_size);
            for i in 0..1_000u32 {
                let label = if i % 2 == 0 {
                    Label::Positive
                } else {
                    Label::Negative
                };
                majorizer.accumulate_row(&row, 0.25, label);
            }
            majorizer
        })
    });
}

fn bench_fold_into(c: &mut Criterion) {
    let j_size = 10_000;
    let row = toy_row(j_size);
    let mut source = Majorizer::new(j_size);
    for _ in 0..1_000u32 {
        source.accumulate_row(&row, 0.25, Label::Positive);
    }
    c.bench_function("majorizer_fold_into", |b| {
        b.iter(|| {
            let mut target = Majorizer::new(j_size);
            target.fold_into(&source);
            target
        })
    });
}

criterion_group!(benches, bench_accumulate_row, bench_fold_into);
criterion_main!(benches);

//! Criterion benchmarks for a full assay evaluation in `midsin-core`.
//!
//! Normal assays run the whole posterior pipeline (mode search, grid,
//! interval minimization); degenerate assays take the root-bracketed grid.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use midsin_config::EstimatorSettings;
use midsin_core::assay::AssayInput;
use midsin_core::evaluate::evaluate;
use midsin_core::records::{evaluate_rows, example_input, input_row, read_rows, write_rows};

fn empty_assay() -> AssayInput {
    AssayInput {
        infected_wells: vec![0; 11],
        ..example_input()
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let settings = EstimatorSettings::default();
    let mut group = c.benchmark_group("evaluate");

    for (name, input) in [("example", example_input()), ("empty", empty_assay())] {
        group.bench_with_input(BenchmarkId::new("single", name), &input, |b, input| {
            b.iter(|| {
                let record = evaluate(black_box(input), black_box(&settings)).unwrap();
                black_box(record.posterior.mode)
            })
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let settings = EstimatorSettings::default();
    let rows: Vec<Vec<String>> = (0..32)
        .map(|i| {
            let mut input = example_input();
            input.label = Some(format!("plate-{}", i));
            input.infected_wells.rotate_left(i % 3);
            input_row(&input, "")
        })
        .collect();
    let mut csv = Vec::new();
    write_rows(&mut csv, &rows).unwrap();

    c.bench_function("batch/32_rows", |b| {
        b.iter(|| {
            let rows = read_rows(black_box(csv.as_slice())).unwrap();
            black_box(evaluate_rows(&rows, &settings).records.len())
        })
    });
}

criterion_group!(benches, bench_evaluate, bench_batch);
criterion_main!(benches);

//! Criterion benchmarks for `midsin-math`.
//!
//! Focus on the kernels evaluated inside a single assay estimate.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use midsin_math::binomial::log_pmf_single_hit;
use midsin_math::{
    bounded_minimize, brent_minimize, brent_root, BoundedOptions, BrentOptions, RootOptions,
};

fn bench_single_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_hit");

    for (name, dose) in [("tiny", 1e-9), ("mid", 0.7), ("saturated", 40.0)] {
        group.bench_with_input(BenchmarkId::new("log_pmf", name), &dose, |b, &dose| {
            b.iter(|| black_box(log_pmf_single_hit(black_box(5), black_box(8), black_box(dose))));
        });
    }

    group.finish();
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("solvers");

    group.bench_function("brent_root_sigmoid", |b| {
        let opts = RootOptions::default();
        b.iter(|| {
            let f = |x: f64| (-(10f64.powf(x))).exp() - 1e-4;
            black_box(brent_root(f, black_box(-10.0), black_box(10.0), &opts))
        });
    });

    group.bench_function("brent_minimize_quadratic", |b| {
        let opts = BrentOptions::default();
        b.iter(|| black_box(brent_minimize(|x| (x - 10.0).powi(2), 0.0, 1.0, &opts)));
    });

    group.bench_function("bounded_minimize_quadratic", |b| {
        let opts = BoundedOptions::default();
        b.iter(|| black_box(bounded_minimize(|x| (x - 0.1).powi(2), 0.0, 0.32, &opts)));
    });

    group.finish();
}

criterion_group!(benches, bench_single_hit, bench_solvers);
criterion_main!(benches);

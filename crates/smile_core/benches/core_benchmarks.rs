//! Criterion benchmarks for smile_core numerical kernels.
//!
//! Measures the weighted Levenberg-Marquardt solver on a smile-shaped
//! problem, Brent root finding, and linear interpolation lookup.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smile_core::math::interpolators::{Interpolator, LinearInterpolator};
use smile_core::math::solvers::{
    BracketRoot, BrentSolver, FiniteDifference, LMConfig, LevenbergMarquardtSolver,
    ModelFunction, SolverConfig,
};
use smile_core::types::SolverError;

/// Quadratic-in-log-moneyness smile: `a + b·k + c·k²`.
struct QuadraticSmile {
    log_moneyness: Vec<f64>,
}

impl ModelFunction for QuadraticSmile {
    type Error = SolverError;

    fn evaluate(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
        Ok(self
            .log_moneyness
            .iter()
            .map(|k| p[0] + p[1] * k + p[2] * k * k)
            .collect())
    }
}

fn smile_data(n: usize) -> (QuadraticSmile, Vec<f64>, Vec<f64>) {
    let log_moneyness: Vec<f64> = (0..n)
        .map(|i| -0.5 + i as f64 / (n - 1) as f64)
        .collect();
    let observed = log_moneyness
        .iter()
        .map(|k| 0.2 - 0.1 * k + 0.3 * k * k)
        .collect();
    let errors = vec![1e-4; n];
    (QuadraticSmile { log_moneyness }, observed, errors)
}

fn bench_levenberg_marquardt(c: &mut Criterion) {
    let mut group = c.benchmark_group("levenberg_marquardt");

    for scheme in [FiniteDifference::Forward, FiniteDifference::Central] {
        let solver = LevenbergMarquardtSolver::new(LMConfig {
            finite_difference: scheme,
            ..LMConfig::default()
        });
        for size in [10, 50] {
            let (model, observed, errors) = smile_data(size);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", scheme), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        solver
                            .solve_weighted(
                                black_box(&model),
                                black_box(&observed),
                                &errors,
                                vec![0.1, 0.0, 0.0],
                            )
                            .unwrap()
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_root_finding(c: &mut Criterion) {
    let mut group = c.benchmark_group("root_finding");
    let f = |x: f64| x.powi(3) - 2.0 * x - 5.0;

    group.bench_function("brent", |b| {
        let solver = BrentSolver::new(SolverConfig::default());
        b.iter(|| solver.find_root(f, black_box(2.0), black_box(3.0)).unwrap());
    });

    group.bench_function("bracket_then_brent", |b| {
        let bracket = BracketRoot::with_defaults();
        let solver = BrentSolver::new(SolverConfig::high_precision());
        b.iter(|| {
            let (lo, hi) = bracket.bracket(f, black_box(0.5), black_box(1.0)).unwrap();
            solver.find_root(f, lo, hi).unwrap()
        });
    });

    group.finish();
}

fn bench_linear_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_interpolation");

    for size in [64, 1024, 4096] {
        let xs: Vec<f64> = (0..size).map(|i| i as f64 / (size - 1) as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| x.sin() + 0.5 * x * x).collect();
        let interp = LinearInterpolator::new(&xs, &ys).unwrap();

        group.bench_with_input(BenchmarkId::new("lookup_100", size), &interp, |b, interp| {
            let test_xs: Vec<f64> = (0..100).map(|i| i as f64 / 99.0).collect();
            b.iter(|| {
                for &x in &test_xs {
                    let _ = interp.interpolate(black_box(x));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("flat_extrapolation", size), &interp, |b, interp| {
            b.iter(|| interp.interpolate_flat(black_box(1.5)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_levenberg_marquardt,
    bench_root_finding,
    bench_linear_interpolation
);
criterion_main!(benches);

//! Property-based tests for midsin-math numerical functions.

use proptest::prelude::*;
use midsin_math::binomial::{log_pmf_single_hit, pmf_single_hit};
use midsin_math::{
    arange, bounded_minimize, brent_minimize, brent_root, cumulative_right_rect, linspace,
    log1mexp, log_binomial, BoundedOptions, BrentOptions, MonotoneInterp, RootOptions,
};

const TOL: f64 = 1e-10;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() && b.is_infinite() {
        return a.signum() == b.signum();
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

// ============================================================================
// Stable primitives
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn log1mexp_is_non_positive_and_increasing(a in 1e-12..50.0f64, b in 1e-12..50.0f64) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(log1mexp(lo) <= 0.0);
        prop_assert!(log1mexp(lo) <= log1mexp(hi));
    }

    #[test]
    fn log1mexp_inverts_to_probability(x in 1e-3..30.0f64) {
        let p = 1.0 - (-x).exp();
        prop_assert!(approx_eq(log1mexp(x).exp(), p, 1e-12));
    }

    #[test]
    fn log_binomial_symmetry(n in 0u64..200, k in 0u64..200) {
        prop_assume!(k <= n);
        prop_assert!(approx_eq(log_binomial(n, k), log_binomial(n, n - k), 1e-9));
    }
}

// ============================================================================
// Single-hit binomial
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn single_hit_pmf_normalizes(n in 1u32..24, log_dose in -6.0..1.5f64) {
        let dose = 10f64.powf(log_dose);
        let total: f64 = (0..=n).map(|k| pmf_single_hit(k, n, dose)).sum();
        prop_assert!(approx_eq(total, 1.0, 1e-9), "n={} dose={} total={}", n, dose, total);
    }

    #[test]
    fn single_hit_log_pmf_is_never_positive(n in 1u32..24, k in 0u32..24, log_dose in -12.0..3.0f64) {
        prop_assume!(k <= n);
        let lp = log_pmf_single_hit(k, n, 10f64.powf(log_dose));
        prop_assert!(!lp.is_nan());
        prop_assert!(lp <= 1e-12);
    }
}

// ============================================================================
// Solvers
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn brent_root_finds_linear_roots(r in -50.0..50.0f64, slope in 0.1..10.0f64) {
        let res = brent_root(|x| slope * (x - r), -100.0, 100.0, &RootOptions::default()).unwrap();
        prop_assert!((res.root - r).abs() < 1e-9);
    }

    #[test]
    fn brent_minimize_finds_quadratic_minimum(c in -30.0..30.0f64, w in 0.1..5.0f64) {
        let res = brent_minimize(|x| w * (x - c).powi(2), 0.0, 1.0, &BrentOptions::default()).unwrap();
        prop_assert!((res.x - c).abs() < 1e-5, "c={} x={}", c, res.x);
    }

    #[test]
    fn bounded_minimize_stays_in_interval(c in -2.0..3.0f64) {
        let res = bounded_minimize(|x| (x - c).powi(2), 0.0, 1.0, &BoundedOptions::default()).unwrap();
        prop_assert!((0.0..=1.0).contains(&res.x));
        let expected = c.clamp(0.0, 1.0);
        prop_assert!((res.x - expected).abs() < 1e-4, "c={} x={}", c, res.x);
    }
}

// ============================================================================
// Grids, quadrature, interpolation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn arange_is_increasing_and_below_stop(start in -20.0..20.0f64, len in 0.01..5.0f64, step in 0.001..0.5f64) {
        let xs = arange(start, start + len, step);
        prop_assert!(!xs.is_empty());
        prop_assert!(xs.windows(2).all(|w| w[1] > w[0]));
        prop_assert!(*xs.last().unwrap() < start + len);
    }

    #[test]
    fn cumulative_integral_is_monotone(ys in prop::collection::vec(0.0..10.0f64, 2..60)) {
        let xs = linspace(0.0, 1.0, ys.len());
        let out = cumulative_right_rect(&xs, &ys);
        prop_assert_eq!(out.len(), ys.len());
        prop_assert_eq!(out[0], 0.0);
        prop_assert!(out.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn interp_reproduces_identity(t in 0.0..1.0f64) {
        let xs = linspace(0.0, 1.0, 11);
        let f = MonotoneInterp::new(xs.clone(), xs, 0.0).unwrap();
        prop_assert!(approx_eq(f.eval(t), t, TOL));
    }
}

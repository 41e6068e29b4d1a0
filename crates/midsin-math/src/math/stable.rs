//! Numerically stable primitives for log-domain likelihood math.

use std::f64::consts::{LN_2, PI};

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // These are published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Stable log(1 - exp(-x)) for x >= 0.
///
/// This is the log probability that a Poisson count with mean `x` is
/// non-zero. Switches between `expm1` and `ln_1p` at ln 2 so both the
/// small-dose and saturated regimes keep full precision.
///
/// Returns NEG_INFINITY at x = 0 and 0 at x = +inf; NaN for x < 0.
pub fn log1mexp(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x < LN_2 {
        (-(-x).exp_m1()).ln()
    } else {
        (-(-x).exp()).ln_1p()
    }
}

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z <= 0.0 {
        let z_round = z.round();
        if (z - z_round).abs() < 1e-15 {
            return f64::NAN;
        }
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// log(n!) using the Gamma function.
pub fn log_factorial(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    log_gamma((n as f64) + 1.0)
}

/// log binomial coefficient: log(n choose k).
pub fn log_binomial(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    log_factorial(n) - log_factorial(k) - log_factorial(n - k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log1mexp_matches_naive_in_safe_range() {
        for x in [0.01_f64, 0.3, 0.69, 0.7, 1.0, 5.0, 20.0] {
            let naive = (1.0 - (-x).exp()).ln();
            assert!(approx_eq(log1mexp(x), naive, 1e-12), "x={x}");
        }
    }

    #[test]
    fn log1mexp_tiny_argument_keeps_precision() {
        // 1 - exp(-x) ~ x for tiny x; the naive form collapses to ln(0).
        let x = 1e-20;
        let out = log1mexp(x);
        assert!(approx_eq(out, x.ln(), 1e-12));
        assert!((1.0 - (-x).exp()).ln().is_infinite());
    }

    #[test]
    fn log1mexp_edges() {
        assert!(log1mexp(0.0).is_infinite() && log1mexp(0.0).is_sign_negative());
        assert_eq!(log1mexp(f64::INFINITY), 0.0);
        assert!(log1mexp(-1.0).is_nan());
        assert!(log1mexp(f64::NAN).is_nan());
    }

    #[test]
    fn log_gamma_known_values() {
        let lg1 = log_gamma(1.0);
        assert!(approx_eq(lg1, 0.0, 1e-12));

        let lg_half = log_gamma(0.5);
        let expected = 0.5 * PI.ln();
        assert!(approx_eq(lg_half, expected, 1e-10));

        let lg5 = log_gamma(5.0); // Gamma(5)=24
        assert!(approx_eq(lg5, 24.0f64.ln(), 1e-10));
    }

    #[test]
    fn log_factorial_and_binomial() {
        let lf = log_factorial(5);
        assert!(approx_eq(lf, 120.0f64.ln(), 1e-12));

        let lbin = log_binomial(5, 2);
        assert!(approx_eq(lbin, 10.0f64.ln(), 1e-12));

        // C(8, 7) = 8
        assert!(approx_eq(log_binomial(8, 7), 8.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_binomial_out_of_range() {
        assert!(log_binomial(3, 4).is_infinite());
        assert_eq!(log_binomial(7, 0), 0.0);
        assert_eq!(log_binomial(7, 7), 0.0);
    }

    #[test]
    fn log_gamma_negative_integer_is_nan() {
        let out = log_gamma(-2.0);
        assert!(out.is_nan());
    }
}

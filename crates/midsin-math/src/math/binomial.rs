//! Binomial well counts under the single-hit Poisson infection model.
//!
//! A well receiving a Poisson-distributed number of infectious units with
//! mean `λ` is infected with probability `p = 1 - exp(-λ)`. Given `n`
//! replicate wells at the same dilution, the number of infected wells `k`
//! follows `Binomial(n, p)`:
//!
//! ```text
//! log P(k | n, λ) = log C(n, k) + k · log(1 - e^-λ) - (n - k) · λ
//! ```
//!
//! Writing the pmf in terms of `λ` rather than `p` keeps both tails exact:
//! `log(1 - p) = -λ` needs no subtraction, and `log p` goes through
//! [`log1mexp`](super::stable::log1mexp) instead of `ln(1 - exp(-λ))`.

use super::stable::{log1mexp, log_binomial};

/// Probability that a well with mean dose `mean_dose` is infected.
///
/// Computed as `-expm1(-λ)` so tiny doses do not round to zero.
pub fn infection_probability(mean_dose: f64) -> f64 {
    if mean_dose.is_nan() || mean_dose < 0.0 {
        return f64::NAN;
    }
    -(-mean_dose).exp_m1()
}

/// Log pmf of `k` infected wells out of `n` at mean dose `mean_dose`.
///
/// Returns NaN for `k > n` or an invalid dose. Terms with a zero count are
/// skipped, so `k = 0` at infinite dose gives `-inf` rather than NaN.
pub fn log_pmf_single_hit(k: u32, n: u32, mean_dose: f64) -> f64 {
    if k > n || mean_dose.is_nan() || mean_dose < 0.0 {
        return f64::NAN;
    }
    let mut out = log_binomial(u64::from(n), u64::from(k));
    if k > 0 {
        out += f64::from(k) * log1mexp(mean_dose);
    }
    let misses = n - k;
    if misses > 0 {
        out -= f64::from(misses) * mean_dose;
    }
    out
}

/// Pmf of `k` infected wells out of `n` at mean dose `mean_dose`.
pub fn pmf_single_hit(k: u32, n: u32, mean_dose: f64) -> f64 {
    let log_p = log_pmf_single_hit(k, n, mean_dose);
    if log_p.is_nan() {
        return f64::NAN;
    }
    log_p.exp()
}

/// Log pmf of `Binomial(n, p)` at `k`, parameterized by probability.
///
/// Handles the `p = 0` and `p = 1` edges exactly.
pub fn log_pmf(k: u32, n: u32, p: f64) -> f64 {
    if k > n || p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if p == 1.0 {
        return if k == n { 0.0 } else { f64::NEG_INFINITY };
    }
    let kf = f64::from(k);
    let misses = f64::from(n - k);
    log_binomial(u64::from(n), u64::from(k)) + kf * p.ln() + misses * (-p).ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() && b.is_nan() {
            return true;
        }
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn infection_probability_known_values() {
        assert!(approx_eq(infection_probability(0.0), 0.0, 1e-15));
        assert!(approx_eq(
            infection_probability(std::f64::consts::LN_2),
            0.5,
            1e-15
        ));
        assert!(approx_eq(infection_probability(f64::INFINITY), 1.0, 0.0));
        assert!(infection_probability(-1.0).is_nan());
    }

    #[test]
    fn infection_probability_tiny_dose_is_linear() {
        let dose = 1e-18;
        let p = infection_probability(dose);
        assert!(p > 0.0);
        assert!(approx_eq(p / dose, 1.0, 1e-12));
    }

    #[test]
    fn single_hit_matches_probability_form() {
        for dose in [0.05, 0.4, 1.0, 2.5, 7.0] {
            let p = infection_probability(dose);
            for k in 0..=8 {
                let a = log_pmf_single_hit(k, 8, dose);
                let b = log_pmf(k, 8, p);
                assert!(approx_eq(a, b, 1e-10), "k={k} dose={dose}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn single_hit_pmf_sums_to_one() {
        for dose in [1e-6, 0.3, 3.0, 40.0] {
            let total: f64 = (0..=12).map(|k| pmf_single_hit(k, 12, dose)).sum();
            assert!(approx_eq(total, 1.0, 1e-10), "dose={dose} total={total}");
        }
    }

    #[test]
    fn single_hit_zero_dose_edges() {
        assert_eq!(log_pmf_single_hit(0, 5, 0.0), 0.0);
        let none_possible = log_pmf_single_hit(1, 5, 0.0);
        assert!(none_possible.is_infinite() && none_possible.is_sign_negative());
    }

    #[test]
    fn single_hit_infinite_dose_edges() {
        assert_eq!(log_pmf_single_hit(5, 5, f64::INFINITY), 0.0);
        let missed = log_pmf_single_hit(4, 5, f64::INFINITY);
        assert!(missed.is_infinite() && missed.is_sign_negative());
    }

    #[test]
    fn single_hit_tiny_dose_stays_finite() {
        // All wells infected at a vanishing dose: p^n underflows in linear
        // space but the log pmf must stay finite.
        let log_p = log_pmf_single_hit(8, 8, 1e-60);
        assert!(log_p.is_finite());
        assert!(approx_eq(log_p, 8.0 * 1e-60f64.ln(), 1e-9));
    }

    #[test]
    fn invalid_inputs_are_nan() {
        assert!(log_pmf_single_hit(6, 5, 1.0).is_nan());
        assert!(log_pmf_single_hit(1, 5, f64::NAN).is_nan());
        assert!(log_pmf(2, 4, -0.1).is_nan());
        assert!(log_pmf(5, 4, 0.5).is_nan());
    }

    #[test]
    fn probability_form_edges() {
        assert_eq!(log_pmf(0, 5, 0.0), 0.0);
        assert!(log_pmf(1, 5, 0.0).is_infinite());
        assert_eq!(log_pmf(5, 5, 1.0), 0.0);
        assert!(log_pmf(4, 5, 1.0).is_infinite());
    }
}

//! Classical 50%-endpoint estimators: Reed-Muench and Spearman-Kärber.
//!
//! Both work directly on the well counts and return log10 titers in the
//! units of the supplied dilution axis. Only the spacing between the first
//! two columns is used; the series is assumed evenly log-spaced.

use midsin_math::trapz;
use schemars::JsonSchema;
use serde::Serialize;

/// Point estimates from the classical estimators (NaN when undefined).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct ClassicalEstimate {
    #[schemars(with = "Option<f64>")]
    pub reed_muench: f64,
    #[schemars(with = "Option<f64>")]
    pub spearman_kaerber: f64,
}

impl ClassicalEstimate {
    pub const UNDEFINED: ClassicalEstimate = ClassicalEstimate {
        reed_muench: f64::NAN,
        spearman_kaerber: f64::NAN,
    };
}

/// Reed-Muench and Spearman-Kärber estimates.
///
/// `log_dilutions[i]` is the log10 dilution of column `i`, least dilute
/// first. Both estimates are undefined for fewer than two columns and for
/// assays with no infected or no uninfected well.
pub fn estimate(log_dilutions: &[f64], infected: &[u32], total: &[u32]) -> ClassicalEstimate {
    let n = log_dilutions.len();
    if n < 2 || infected.len() != n || total.len() != n {
        return ClassicalEstimate::UNDEFINED;
    }
    if infected.iter().zip(total).any(|(&k, &t)| k > t) {
        return ClassicalEstimate::UNDEFINED;
    }
    let total_infected: u64 = infected.iter().map(|&k| u64::from(k)).sum();
    let total_uninfected: u64 = infected
        .iter()
        .zip(total)
        .map(|(&k, &t)| u64::from(t - k))
        .sum();
    if total_infected == 0 || total_uninfected == 0 {
        return ClassicalEstimate::UNDEFINED;
    }

    let df = (log_dilutions[1] - log_dilutions[0]).abs();
    ClassicalEstimate {
        reed_muench: reed_muench(log_dilutions, infected, total, df),
        spearman_kaerber: spearman_kaerber(log_dilutions, infected, total, df),
    }
}

/// Infected wells accumulate from the most dilute column up, uninfected
/// wells from the least dilute column down.
fn reed_muench(log_dilutions: &[f64], infected: &[u32], total: &[u32], df: f64) -> f64 {
    let n = infected.len();

    let mut infected_below = vec![0.0; n];
    let mut acc = 0.0;
    for i in (0..n).rev() {
        acc += f64::from(infected[i]);
        infected_below[i] = acc;
    }

    let mut frac = Vec::with_capacity(n);
    let mut uninfected_above = 0.0;
    for i in 0..n {
        uninfected_above += f64::from(total[i] - infected[i]);
        frac.push(infected_below[i] / (infected_below[i] + uninfected_above));
    }

    let crossing = match frac.iter().position(|&f| f < 0.5) {
        Some(c) if c > 0 => c,
        _ => return f64::NAN,
    };
    let above = frac[crossing - 1];
    let below = frac[crossing];
    let propdist = (above - 0.5) / (above - below);
    df * propdist - log_dilutions[crossing - 1]
}

fn spearman_kaerber(log_dilutions: &[f64], infected: &[u32], total: &[u32], df: f64) -> f64 {
    let frac: Vec<f64> = infected
        .iter()
        .zip(total)
        .map(|(&k, &t)| f64::from(k) / f64::from(t))
        .collect();

    let start = match frac.iter().position(|&f| f < 1.0) {
        Some(s) => s,
        None => return f64::NAN,
    };

    if start == 0 {
        // Assume a saturated column one step more concentrated than the first.
        let mut padded = Vec::with_capacity(frac.len() + 1);
        padded.push(1.0);
        padded.extend_from_slice(&frac);
        return df * trapz(&padded) - (log_dilutions[0] + df);
    }

    df * trapz(&frac[start..]) - log_dilutions[start]
}

//! Plot data derived from a [`ResultRecord`].
//!
//! Two panels per assay: the posterior over log10 SIN/mL with its credible
//! bands, and the expected number of infected wells against dilution. Only
//! the numbers are produced here; drawing is left to the caller.

use midsin_math::binomial::infection_probability;
use midsin_math::linspace;
use schemars::JsonSchema;
use serde::Serialize;

use crate::evaluate::ResultRecord;

pub const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// `log10(exp(-γ))`: offset from a log10 TCID50 to a log10 SIN estimate.
pub const WULFF_CORRECTION: f64 = -EULER_MASCHERONI * std::f64::consts::LOG10_E;

/// Only grid points above this fraction of the peak are drawn.
pub const VISIBLE_FRACTION: f64 = 1e-3;

pub const DEFAULT_CURVE_POINTS: usize = 200;

/// Grid points strictly inside one credible interval.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PosteriorBand {
    pub coverage: f64,
    #[schemars(with = "Option<f64>")]
    pub lower: f64,
    #[schemars(with = "Option<f64>")]
    pub upper: f64,
    pub inside: Vec<bool>,
}

/// Posterior panel.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PosteriorPlot {
    /// Degenerate assay: the whole unscaled likelihood is shown.
    pub limit_of_detection: bool,
    /// `density = pdf / 10^scale_exponent`.
    pub scale_exponent: i32,
    pub grid: Vec<f64>,
    pub density: Vec<f64>,
    pub visible: Vec<bool>,
    pub bands: Vec<PosteriorBand>,
    #[schemars(with = "Option<f64>")]
    pub mode: f64,
    #[schemars(with = "Option<f64>")]
    pub reed_muench_marker: f64,
    #[schemars(with = "Option<f64>")]
    pub spearman_kaerber_marker: f64,
}

impl PosteriorPlot {
    /// Panel title: the mode with each interval as offsets from it.
    pub fn annotation(&self) -> String {
        if self.limit_of_detection {
            return "Limit of detection".to_string();
        }
        let mut text = format!("{:.3}", self.mode);
        for (i, band) in self.bands.iter().enumerate() {
            let offsets = format!("{:+.2}/{:+.2}", band.lower - self.mode, band.upper - self.mode);
            if i == 0 {
                text.push(' ');
                text.push_str(&offsets);
            } else {
                text.push_str(&format!(" [{}]", offsets));
            }
        }
        text
    }
}

pub fn posterior_plot(record: &ResultRecord) -> PosteriorPlot {
    let post = &record.posterior;
    let peak = post.pdf.iter().copied().fold(0.0_f64, f64::max);

    if record.state.is_degenerate() || !(peak > 0.0) {
        return PosteriorPlot {
            limit_of_detection: true,
            scale_exponent: 0,
            grid: post.grid.clone(),
            density: post.pdf.clone(),
            visible: vec![true; post.grid.len()],
            bands: Vec::new(),
            mode: post.mode,
            reed_muench_marker: f64::NAN,
            spearman_kaerber_marker: f64::NAN,
        };
    }

    let scale_exponent = (peak.log10() - 0.5).round_ties_even() as i32;
    let scale = 10f64.powi(scale_exponent);
    let threshold = peak * VISIBLE_FRACTION;

    let bands = post
        .intervals()
        .into_iter()
        .map(|ci| PosteriorBand {
            coverage: ci.coverage,
            lower: ci.lower,
            upper: ci.upper,
            inside: post.grid.iter().map(|&x| ci.lower < x && x < ci.upper).collect(),
        })
        .collect();

    PosteriorPlot {
        limit_of_detection: false,
        scale_exponent,
        grid: post.grid.clone(),
        density: post.pdf.iter().map(|p| p / scale).collect(),
        visible: post.pdf.iter().map(|&p| p > threshold).collect(),
        bands,
        mode: post.mode,
        reed_muench_marker: record.reed_muench + WULFF_CORRECTION,
        spearman_kaerber_marker: record.spearman_kaerber + WULFF_CORRECTION,
    }
}

/// Expected infected wells between the curves of one interval's bounds.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ResponseBand {
    pub coverage: f64,
    #[schemars(with = "Vec<Option<f64>>")]
    pub lower: Vec<f64>,
    #[schemars(with = "Vec<Option<f64>>")]
    pub upper: Vec<f64>,
}

/// Observed infected wells, rescaled to the typical replicate count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct ObservedPoint {
    pub log_dilution: f64,
    pub infected: f64,
}

/// Dose-response panel. The x axis is the log10 sample dilution.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DoseResponseCurve {
    pub log_dilutions: Vec<f64>,
    /// Expected infected wells at the posterior mode.
    #[schemars(with = "Vec<Option<f64>>")]
    pub expected: Vec<f64>,
    pub bands: Vec<ResponseBand>,
    pub observed: Vec<ObservedPoint>,
    /// Reference line at half the largest replicate count.
    pub half_max: f64,
    pub max_wells: u32,
    /// Classical estimates placed on the `log_dilutions` axis.
    #[schemars(with = "Option<f64>")]
    pub reed_muench_marker: f64,
    #[schemars(with = "Option<f64>")]
    pub spearman_kaerber_marker: f64,
}

pub fn dose_response(record: &ResultRecord, points: usize) -> DoseResponseCurve {
    let half_step = record.dilution_factor.log10() / 2.0;
    let (first, last) = match (record.dilutions.first(), record.dilutions.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => (f64::NAN, f64::NAN),
    };
    let axis = linspace(last + half_step, first - half_step, points);

    let max_wells = record.total_wells.iter().copied().max().unwrap_or(0);
    let n_max = f64::from(max_wells);
    let volume = record.inoculum_volume;
    let curve_at = |log_conc: f64| -> Vec<f64> {
        axis.iter()
            .map(|&d| n_max * infection_probability(10f64.powf(d + log_conc) * volume))
            .collect()
    };

    let bands = record
        .intervals()
        .into_iter()
        .map(|ci| ResponseBand {
            coverage: ci.coverage,
            lower: curve_at(ci.lower),
            upper: curve_at(ci.upper),
        })
        .collect();

    // Spoiled wells: show each column as if it had the typical replicate count.
    let typical = if record.total_wells.is_empty() {
        0.0
    } else {
        let sum: f64 = record.total_wells.iter().map(|&n| f64::from(n)).sum();
        (sum / record.total_wells.len() as f64).round_ties_even()
    };
    let observed = record
        .dilutions
        .iter()
        .zip(record.infected_wells.iter().zip(&record.total_wells))
        .map(|(&log_dilution, (&k, &n))| ObservedPoint {
            log_dilution,
            infected: f64::from(k) / f64::from(n) * typical,
        })
        .collect();

    // Classical estimates are per mL and positive; the axis is a per-well
    // log dilution.
    let per_well = volume.log10();
    DoseResponseCurve {
        expected: curve_at(record.posterior.mode),
        log_dilutions: axis,
        bands,
        observed,
        half_max: n_max * 0.5,
        max_wells,
        reed_muench_marker: -(record.reed_muench + per_well),
        spearman_kaerber_marker: -(record.spearman_kaerber + per_well),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assay::AssayInput;
    use crate::evaluate::evaluate_default;

    fn example() -> AssayInput {
        AssayInput {
            label: None,
            inoculum_volume: 0.1,
            min_dilution: 0.01,
            dilution_factor: 0.1,
            total_wells: vec![8; 11],
            infected_wells: vec![8, 8, 8, 8, 8, 7, 7, 5, 2, 0, 0],
        }
    }

    #[test]
    fn wulff_correction_value() {
        assert!((WULFF_CORRECTION - (-EULER_MASCHERONI).exp().log10()).abs() < 1e-15);
        assert!((WULFF_CORRECTION + 0.250_682).abs() < 1e-6);
    }

    #[test]
    fn posterior_panel_for_example() {
        let rec = evaluate_default(&example()).unwrap();
        let plot = posterior_plot(&rec);
        assert!(!plot.limit_of_detection);
        assert_eq!(plot.bands.len(), 2);

        let peak = plot.density.iter().copied().fold(0.0, f64::max);
        assert!((1.0 - 1e-9..=10.0 + 1e-9).contains(&peak), "{}", peak);

        // The 68% band sits inside the 95% band, which sits inside the window.
        for i in 0..plot.grid.len() {
            if plot.bands[0].inside[i] {
                assert!(plot.bands[1].inside[i]);
            }
            if plot.bands[1].inside[i] {
                assert!(plot.visible[i]);
            }
        }
        assert!((plot.reed_muench_marker - (rec.reed_muench + WULFF_CORRECTION)).abs() < 1e-12);
        assert!(plot.annotation().starts_with(&format!("{:.3}", rec.posterior.mode)));
    }

    #[test]
    fn degenerate_panel_is_unscaled() {
        let mut input = example();
        input.infected_wells = vec![0; 11];
        let rec = evaluate_default(&input).unwrap();
        let plot = posterior_plot(&rec);
        assert!(plot.limit_of_detection);
        assert_eq!(plot.scale_exponent, 0);
        assert_eq!(plot.density, rec.posterior.pdf);
        assert_eq!(plot.annotation(), "Limit of detection");
    }

    #[test]
    fn dose_response_spans_half_a_step_beyond_the_series() {
        let rec = evaluate_default(&example()).unwrap();
        let curve = dose_response(&rec, DEFAULT_CURVE_POINTS);
        assert_eq!(curve.log_dilutions.len(), 200);
        assert!((curve.log_dilutions[0] - (-12.5)).abs() < 1e-9);
        assert!((curve.log_dilutions[199] - (-1.5)).abs() < 1e-9);
        assert_eq!(curve.half_max, 4.0);

        // Concentrated end saturates, dilute end is empty.
        assert!((curve.expected[199] - 8.0).abs() < 1e-6);
        assert!(curve.expected[0] < 0.01);
        assert!(curve.expected.windows(2).all(|w| w[0] <= w[1]));

        // Half the wells are infected where 10^(d + mode) · V = ln 2.
        let half = std::f64::consts::LN_2.log10() - rec.posterior.mode - 0.1f64.log10();
        let i = curve
            .log_dilutions
            .iter()
            .position(|&d| d > half)
            .unwrap();
        assert!((curve.expected[i] - 4.0).abs() < 0.5);

        // Classical markers share the axis but not the Bayesian half point.
        assert!(curve.spearman_kaerber_marker.is_finite());
        assert!(curve.reed_muench_marker.is_finite());
    }

    #[test]
    fn observed_points_rescale_spoiled_wells() {
        let mut input = example();
        input.total_wells[5] = 7;
        input.infected_wells[5] = 7;
        let rec = evaluate_default(&input).unwrap();
        let curve = dose_response(&rec, 10);
        // (10·8 + 7) / 11 rounds to 8
        assert!((curve.observed[5].infected - 8.0).abs() < 1e-12);
        assert!((curve.observed[8].infected - 2.0).abs() < 1e-12);
    }
}

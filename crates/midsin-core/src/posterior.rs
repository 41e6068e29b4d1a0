//! Posterior over log10-concentration.
//!
//! With a flat prior the posterior is proportional to the likelihood. The
//! estimator tabulates it on a grid, integrates it into a CDF, and searches
//! the inverse CDF for the narrowest interval at each coverage.
//!
//! ```text
//! sample(): mode ─► grid ─► pdf ─► cdf ─► credible intervals, mean
//! ```
//!
//! Degenerate assays (nothing or everything infected) have a likelihood that
//! saturates instead of peaking. Their grid spans the transition between two
//! likelihood levels, and mode, mean and intervals are NaN.

use midsin_config::EstimatorSettings;
use midsin_math::{
    arange, bounded_minimize, brent_minimize, brent_root, cumulative_right_rect, linspace,
    BoundedOptions, InterpError, MonotoneInterp, SolverError,
};
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::assay::{AssayModel, AssayState};
use crate::logging::{event_names, Stage};

/// Step of the estimation pipeline, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PosteriorStage {
    Mode,
    Grid,
    Cdf,
    Bounds,
}

impl std::fmt::Display for PosteriorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PosteriorStage::Mode => write!(f, "mode"),
            PosteriorStage::Grid => write!(f, "grid"),
            PosteriorStage::Cdf => write!(f, "cdf"),
            PosteriorStage::Bounds => write!(f, "bounds"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("{stage} search failed: {detail}")]
    NonConvergence {
        stage: PosteriorStage,
        detail: String,
    },

    #[error("posterior cannot be normalized: {detail}")]
    Unnormalizable { detail: String },
}

impl EstimatorError {
    pub fn stage(&self) -> PosteriorStage {
        match self {
            EstimatorError::NonConvergence { stage, .. } => *stage,
            EstimatorError::Unnormalizable { .. } => PosteriorStage::Cdf,
        }
    }

    fn solver(stage: PosteriorStage, err: SolverError) -> Self {
        EstimatorError::NonConvergence {
            stage,
            detail: err.to_string(),
        }
    }
}

impl From<InterpError> for EstimatorError {
    fn from(err: InterpError) -> Self {
        EstimatorError::Unnormalizable {
            detail: err.to_string(),
        }
    }
}

/// A credible interval at one coverage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct CredibleInterval {
    pub coverage: f64,
    #[schemars(with = "Option<f64>")]
    pub lower: f64,
    #[schemars(with = "Option<f64>")]
    pub upper: f64,
}

impl CredibleInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }
}

/// Tabulated posterior and its summaries.
///
/// `grid`, `pdf` and `cdf` have equal length; `cdf` is derived from the
/// other two, starts at 0 and ends at 1.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PosteriorSample {
    /// log10 SIN/mL, strictly increasing.
    pub grid: Vec<f64>,
    /// Unnormalized likelihood at each grid point.
    pub pdf: Vec<f64>,
    pub cdf: Vec<f64>,
    #[schemars(with = "Option<f64>")]
    pub mode: f64,
    #[schemars(with = "Option<f64>")]
    pub mean: f64,
    pub coverages: Vec<f64>,
    /// `[lo, hi]` per coverage, flattened in coverage order.
    #[schemars(with = "Vec<Option<f64>>")]
    pub credible_intervals: Vec<f64>,
}

impl PosteriorSample {
    pub fn intervals(&self) -> Vec<CredibleInterval> {
        self.coverages
            .iter()
            .zip(self.credible_intervals.chunks_exact(2))
            .map(|(&coverage, bounds)| CredibleInterval {
                coverage,
                lower: bounds[0],
                upper: bounds[1],
            })
            .collect()
    }

    pub fn interval(&self, coverage: f64) -> Option<CredibleInterval> {
        self.intervals()
            .into_iter()
            .find(|ci| (ci.coverage - coverage).abs() < 1e-12)
    }
}

/// Runs the estimation pipeline for one assay.
pub struct PosteriorEstimator<'a> {
    model: &'a AssayModel,
    settings: &'a EstimatorSettings,
}

impl<'a> PosteriorEstimator<'a> {
    pub fn new(model: &'a AssayModel, settings: &'a EstimatorSettings) -> Self {
        Self { model, settings }
    }

    /// Maximum-likelihood log10-concentration; NaN for degenerate assays.
    pub fn mode(&self) -> Result<f64, EstimatorError> {
        if self.model.state().is_degenerate() {
            return Ok(f64::NAN);
        }
        // Start the bracket search in the middle of the dilution series.
        let log_doses = self.model.log_doses();
        let first = log_doses[0];
        let last = log_doses[log_doses.len() - 1];
        let start = -0.5 * (first + last);

        let res = brent_minimize(
            |x| -self.model.log_likelihood(x),
            start,
            start + 1.0,
            &self.settings.solver.mode,
        )
        .map_err(|e| EstimatorError::solver(PosteriorStage::Mode, e))?;

        debug!(
            target: event_names::POSTERIOR_MODE,
            stage = %Stage::Posterior,
            mode = res.x,
            iterations = res.iterations,
            function_calls = res.function_calls,
            "mode found"
        );
        Ok(res.x)
    }

    /// Grid of log10-concentrations on which the posterior is tabulated.
    pub fn build_grid(&self, mode: f64) -> Result<Vec<f64>, EstimatorError> {
        match self.model.state() {
            AssayState::Normal => Ok(self.normal_grid(mode)),
            AssayState::Empty | AssayState::Full => self.degenerate_grid(),
        }
    }

    fn normal_grid(&self, mode: f64) -> Vec<f64> {
        let g = &self.settings.grid;
        let fine = g.fine_half_width;
        let outer = g.fine_half_width + g.coarse_width;

        let mut grid = arange(mode - outer, mode - fine, g.coarse_step);
        grid.extend(arange(-fine, fine, g.fine_step).into_iter().map(|x| x + mode));
        grid.extend(arange(fine, outer, g.coarse_step).into_iter().map(|x| x + mode));
        grid
    }

    fn degenerate_grid(&self) -> Result<Vec<f64>, EstimatorError> {
        let g = &self.settings.grid;
        let log_doses = self.model.log_doses();
        let a = -log_doses[0] - g.bracket_decades;
        let b = -log_doses[log_doses.len() - 1] + g.bracket_decades;

        let root_at = |target: f64| {
            brent_root(
                |x| self.model.likelihood(x) - target,
                a,
                b,
                &self.settings.solver.root,
            )
            .map(|r| r.root)
            .map_err(|e| EstimatorError::solver(PosteriorStage::Grid, e))
        };
        let lo_level = root_at(g.lower_target)?;
        let hi_level = root_at(g.upper_target)?;

        debug!(
            target: event_names::POSTERIOR_GRID,
            stage = %Stage::Posterior,
            state = %self.model.state(),
            lower_level_at = lo_level,
            upper_level_at = hi_level,
            "degenerate grid bounds"
        );
        Ok(linspace(
            lo_level.min(hi_level),
            lo_level.max(hi_level),
            g.degenerate_points,
        ))
    }

    /// Unnormalized likelihood at each grid point.
    pub fn compute_pdf(&self, grid: &[f64]) -> Vec<f64> {
        self.model.likelihood_at(grid)
    }

    /// Narrowest interval at each configured coverage, flattened.
    pub fn credible_bounds(&self, grid: &[f64], cdf: &[f64]) -> Result<Vec<f64>, EstimatorError> {
        let n = self.settings.coverages.len();
        if self.model.state().is_degenerate() {
            return Ok(vec![f64::NAN; 2 * n]);
        }
        let ppf = inverse_cdf(cdf, grid)?;
        let mut bounds = Vec::with_capacity(2 * n);
        for &coverage in &self.settings.coverages {
            let ci = narrowest_interval(&ppf, coverage, &self.settings.solver.interval)?;
            debug!(
                target: event_names::POSTERIOR_BOUNDS,
                stage = %Stage::Posterior,
                coverage,
                lower = ci.lower,
                upper = ci.upper,
                "credible interval"
            );
            bounds.push(ci.lower);
            bounds.push(ci.upper);
        }
        Ok(bounds)
    }

    /// Run the whole pipeline.
    pub fn sample(&self) -> Result<PosteriorSample, EstimatorError> {
        let mode = self.mode()?;
        let grid = self.build_grid(mode)?;
        let log_pdf: Vec<f64> = grid.iter().map(|&x| self.model.log_likelihood(x)).collect();
        let pdf: Vec<f64> = log_pdf.iter().map(|l| l.exp()).collect();

        // Normalization only needs relative weights; shifting by the peak
        // keeps them representable when the likelihood itself underflows.
        let weights = relative_weights(&log_pdf)?;
        let cdf = compute_cdf(&grid, &weights)?;
        let credible_intervals = self.credible_bounds(&grid, &cdf)?;
        let mean = if self.model.state().is_degenerate() {
            f64::NAN
        } else {
            weighted_mean(&grid, &weights)
        };

        Ok(PosteriorSample {
            grid,
            pdf,
            cdf,
            mode,
            mean,
            coverages: self.settings.coverages.clone(),
            credible_intervals,
        })
    }
}

fn relative_weights(log_pdf: &[f64]) -> Result<Vec<f64>, EstimatorError> {
    let peak = log_pdf.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !peak.is_finite() {
        return Err(EstimatorError::Unnormalizable {
            detail: format!("peak log-likelihood on the grid is {}", peak),
        });
    }
    Ok(log_pdf.iter().map(|l| (l - peak).exp()).collect())
}

/// Right-rectangle CDF of `pdf` over `grid`, normalized to end at 1.
pub fn compute_cdf(grid: &[f64], pdf: &[f64]) -> Result<Vec<f64>, EstimatorError> {
    let mut cdf = cumulative_right_rect(grid, pdf);
    let total = cdf.last().copied().unwrap_or(0.0);
    if !(total.is_finite() && total > 0.0) {
        return Err(EstimatorError::Unnormalizable {
            detail: format!("integrated likelihood is {}", total),
        });
    }
    for c in &mut cdf {
        *c /= total;
    }
    Ok(cdf)
}

/// Inverse of a tabulated CDF; 0 outside [0, 1].
pub fn inverse_cdf(cdf: &[f64], grid: &[f64]) -> Result<MonotoneInterp, EstimatorError> {
    Ok(MonotoneInterp::new(cdf.to_vec(), grid.to_vec(), 0.0)?)
}

/// Pdf-weighted average of the grid.
pub fn weighted_mean(grid: &[f64], pdf: &[f64]) -> f64 {
    let total: f64 = pdf.iter().sum();
    let moment: f64 = grid.iter().zip(pdf).map(|(x, p)| x * p).sum();
    moment / total
}

/// Minimize `ppf(t + coverage) - ppf(t)` over `t ∈ [0, 1 - coverage]`.
fn narrowest_interval(
    ppf: &MonotoneInterp,
    coverage: f64,
    opts: &BoundedOptions,
) -> Result<CredibleInterval, EstimatorError> {
    let upper_of = |t: f64| ppf.eval((t + coverage).min(1.0));
    let res = bounded_minimize(
        |t| upper_of(t) - ppf.eval(t),
        0.0,
        1.0 - coverage,
        opts,
    )
    .map_err(|e| EstimatorError::solver(PosteriorStage::Bounds, e))?;

    Ok(CredibleInterval {
        coverage,
        lower: ppf.eval(res.x),
        upper: upper_of(res.x),
    })
}

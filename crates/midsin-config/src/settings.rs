//! Typed estimator settings (settings.json).
//!
//! Every field has a default, so a settings file only needs to name what it
//! overrides:
//!
//! ```json
//! { "schema_version": "1.0.0", "coverages": [0.5, 0.9, 0.99] }
//! ```

use midsin_math::{BoundedOptions, BrentOptions, RootOptions};
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;
use crate::CONFIG_SCHEMA_VERSION;

/// Settings controlling one posterior evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    pub schema_version: String,

    /// Credible-interval coverages, strictly increasing in (0, 1).
    pub coverages: Vec<f64>,

    pub grid: GridSettings,

    pub solver: SolverSettings,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            coverages: vec![0.68, 0.95],
            grid: GridSettings::default(),
            solver: SolverSettings::default(),
        }
    }
}

/// Layout of the log10-concentration grid.
///
/// For a normal assay the grid spans `mode ± (fine_half_width + coarse_width)`:
/// a fine band of `±fine_half_width` around the mode and a coarse band of
/// `coarse_width` decades on each side of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub fine_step: f64,
    pub coarse_step: f64,
    pub fine_half_width: f64,
    pub coarse_width: f64,

    /// Points on the grid of an all-infected or all-uninfected assay.
    pub degenerate_points: usize,

    /// Likelihood levels bounding the degenerate grid.
    pub lower_target: f64,
    pub upper_target: f64,

    /// Decades added beyond the dilution series when bracketing those levels.
    pub bracket_decades: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            fine_step: 0.002,
            coarse_step: 0.01,
            fine_half_width: 1.0,
            coarse_width: 1.0,
            degenerate_points: 500,
            lower_target: 1e-4,
            upper_target: 0.9999,
            bracket_decades: 10.0,
        }
    }
}

/// Solver tolerances and iteration caps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Degenerate-grid root finder.
    pub root: RootOptions,
    /// Mode search.
    pub mode: BrentOptions,
    /// Narrowest-interval search.
    pub interval: BoundedOptions,
}

impl EstimatorSettings {
    /// Load settings from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse settings from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(content).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

//! Endpoint-dilution assay model.
//!
//! An assay is a series of dilution columns, each with a number of replicate
//! wells scored infected or not. Under the single-hit Poisson model a well in
//! column `i` of a sample with concentration `10^x` SIN/mL is infected with
//! probability `1 - exp(-dose_per_well[i] · 10^x)`, and the infected count of
//! the column is binomial.

use midsin_math::binomial::log_pmf_single_hit;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw assay as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssayInput {
    /// Free-form identifier echoed in the results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Volume applied to each well, in mL.
    pub inoculum_volume: f64,

    /// Dilution fraction of the first (least dilute) column, in (0, 1].
    pub min_dilution: f64,

    /// Ratio between successive columns, in (0, 1).
    pub dilution_factor: f64,

    /// Wells per column, least dilute first.
    pub total_wells: Vec<u32>,

    /// Infected wells per column.
    pub infected_wells: Vec<u32>,
}

/// Classification of an assay by its extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssayState {
    /// At least one infected and one uninfected well.
    Normal,
    /// No infected well anywhere (lower limit of detection).
    Empty,
    /// Every well infected (upper limit of detection).
    Full,
}

impl AssayState {
    pub fn is_degenerate(self) -> bool {
        !matches!(self, AssayState::Normal)
    }
}

impl std::fmt::Display for AssayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssayState::Normal => write!(f, "normal"),
            AssayState::Empty => write!(f, "empty"),
            AssayState::Full => write!(f, "full"),
        }
    }
}

/// Rejected assay input. Columns are reported 1-based.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssayError {
    #[error("assay has no dilution columns")]
    NoColumns,

    #[error("{total} total-well counts but {infected} infected-well counts")]
    LengthMismatch { total: usize, infected: usize },

    #[error("{field} must be {expected}, got {value}")]
    InvalidParameter {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("column {}: no wells", .column + 1)]
    NoWells { column: usize },

    #[error("column {}: {infected} infected wells out of {total}", .column + 1)]
    TooManyInfected {
        column: usize,
        infected: u32,
        total: u32,
    },

    #[error("column {}: dose per well underflows to zero", .column + 1)]
    DoseUnderflow { column: usize },
}

impl From<AssayError> for midsin_common::Error {
    fn from(err: AssayError) -> Self {
        midsin_common::Error::InvalidAssay(err.to_string())
    }
}

/// Validated assay with derived per-column quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct AssayModel {
    inoculum_volume: f64,
    min_dilution: f64,
    dilution_factor: f64,
    infected_wells: Vec<u32>,
    total_wells: Vec<u32>,
    uninfected_wells: Vec<u32>,
    dose_per_well: Vec<f64>,
    state: AssayState,
}

fn check_parameter(
    field: &'static str,
    value: f64,
    ok: bool,
    expected: &'static str,
) -> Result<(), AssayError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(AssayError::InvalidParameter {
            field,
            value,
            expected,
        })
    }
}

impl AssayModel {
    pub fn new(
        inoculum_volume: f64,
        min_dilution: f64,
        dilution_factor: f64,
        infected_wells: Vec<u32>,
        total_wells: Vec<u32>,
    ) -> Result<Self, AssayError> {
        if total_wells.len() != infected_wells.len() {
            return Err(AssayError::LengthMismatch {
                total: total_wells.len(),
                infected: infected_wells.len(),
            });
        }
        if total_wells.is_empty() {
            return Err(AssayError::NoColumns);
        }
        check_parameter(
            "inoculum_volume",
            inoculum_volume,
            inoculum_volume > 0.0,
            "positive",
        )?;
        check_parameter(
            "min_dilution",
            min_dilution,
            min_dilution > 0.0 && min_dilution <= 1.0,
            "in (0, 1]",
        )?;
        check_parameter(
            "dilution_factor",
            dilution_factor,
            dilution_factor > 0.0 && dilution_factor < 1.0,
            "in (0, 1)",
        )?;

        let mut uninfected_wells = Vec::with_capacity(total_wells.len());
        for (column, (&infected, &total)) in infected_wells.iter().zip(&total_wells).enumerate() {
            if total == 0 {
                return Err(AssayError::NoWells { column });
            }
            if infected > total {
                return Err(AssayError::TooManyInfected {
                    column,
                    infected,
                    total,
                });
            }
            uninfected_wells.push(total - infected);
        }

        let mut dose_per_well = Vec::with_capacity(total_wells.len());
        for column in 0..total_wells.len() {
            let dose = inoculum_volume * min_dilution * dilution_factor.powi(column as i32);
            if !(dose > 0.0) {
                return Err(AssayError::DoseUnderflow { column });
            }
            dose_per_well.push(dose);
        }

        let any_infected = infected_wells.iter().any(|&k| k > 0);
        let any_uninfected = uninfected_wells.iter().any(|&m| m > 0);
        let state = match (any_infected, any_uninfected) {
            (false, _) => AssayState::Empty,
            (true, false) => AssayState::Full,
            (true, true) => AssayState::Normal,
        };

        Ok(Self {
            inoculum_volume,
            min_dilution,
            dilution_factor,
            infected_wells,
            total_wells,
            uninfected_wells,
            dose_per_well,
            state,
        })
    }

    pub fn from_input(input: &AssayInput) -> Result<Self, AssayError> {
        Self::new(
            input.inoculum_volume,
            input.min_dilution,
            input.dilution_factor,
            input.infected_wells.clone(),
            input.total_wells.clone(),
        )
    }

    pub fn state(&self) -> AssayState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.state == AssayState::Empty
    }

    pub fn is_full(&self) -> bool {
        self.state == AssayState::Full
    }

    pub fn columns(&self) -> usize {
        self.total_wells.len()
    }

    pub fn inoculum_volume(&self) -> f64 {
        self.inoculum_volume
    }

    pub fn dilution_factor(&self) -> f64 {
        self.dilution_factor
    }

    pub fn infected_wells(&self) -> &[u32] {
        &self.infected_wells
    }

    pub fn total_wells(&self) -> &[u32] {
        &self.total_wells
    }

    pub fn uninfected_wells(&self) -> &[u32] {
        &self.uninfected_wells
    }

    /// Expected infectious units per well at a concentration of 1 SIN/mL.
    pub fn dose_per_well(&self) -> &[f64] {
        &self.dose_per_well
    }

    /// `log10(min_dilution · dilution_factor^i)` per column.
    pub fn log_dilutions(&self) -> Vec<f64> {
        (0..self.columns())
            .map(|i| self.min_dilution.log10() + i as f64 * self.dilution_factor.log10())
            .collect()
    }

    /// `log10(dose_per_well[i])`, the dilution axis in per-mL units.
    pub fn log_doses(&self) -> Vec<f64> {
        self.dose_per_well.iter().map(|d| d.log10()).collect()
    }

    /// Log-likelihood of the observed counts at log10-concentration `x`.
    pub fn log_likelihood(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let concentration = 10f64.powf(x);
        self.dose_per_well
            .iter()
            .zip(self.infected_wells.iter().zip(&self.total_wells))
            .map(|(&dose, (&k, &n))| log_pmf_single_hit(k, n, dose * concentration))
            .sum()
    }

    /// Unnormalized likelihood at log10-concentration `x`.
    pub fn likelihood(&self, x: f64) -> f64 {
        self.log_likelihood(x).exp()
    }

    pub fn likelihood_at(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.likelihood(x)).collect()
    }
}

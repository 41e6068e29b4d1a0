//! Full evaluation of an assay: posterior summaries plus classical estimates.

use midsin_common::SCHEMA_VERSION;
use midsin_config::EstimatorSettings;
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::assay::{AssayError, AssayInput, AssayModel, AssayState};
use crate::classical::{self, ClassicalEstimate};
use crate::logging::{event_names, Stage};
use crate::posterior::{CredibleInterval, EstimatorError, PosteriorEstimator, PosteriorSample};

/// Everything computed for one assay.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ResultRecord {
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub state: AssayState,
    #[serde(flatten)]
    pub posterior: PosteriorSample,
    /// Reed-Muench, log10 TCID50/mL.
    #[schemars(with = "Option<f64>")]
    pub reed_muench: f64,
    /// Spearman-Kärber, log10 TCID50/mL.
    #[schemars(with = "Option<f64>")]
    pub spearman_kaerber: f64,
    /// log10 dilution of each column.
    pub dilutions: Vec<f64>,
    pub inoculum_volume: f64,
    pub dilution_factor: f64,
    pub infected_wells: Vec<u32>,
    pub total_wells: Vec<u32>,
}

impl ResultRecord {
    pub fn is_empty(&self) -> bool {
        self.state == AssayState::Empty
    }

    pub fn is_full(&self) -> bool {
        self.state == AssayState::Full
    }

    pub fn intervals(&self) -> Vec<CredibleInterval> {
        self.posterior.intervals()
    }

    pub fn classical(&self) -> ClassicalEstimate {
        ClassicalEstimate {
            reed_muench: self.reed_muench,
            spearman_kaerber: self.spearman_kaerber,
        }
    }

    /// Scalar projection for tables.
    pub fn to_summary(&self) -> ResultSummary {
        ResultSummary {
            label: self.label.clone(),
            state: self.state,
            mode: self.posterior.mode,
            mean: self.posterior.mean,
            intervals: self.intervals(),
            reed_muench: self.reed_muench,
            spearman_kaerber: self.spearman_kaerber,
        }
    }
}

/// Point and interval estimates without the tabulated posterior.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ResultSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub state: AssayState,
    #[schemars(with = "Option<f64>")]
    pub mode: f64,
    #[schemars(with = "Option<f64>")]
    pub mean: f64,
    pub intervals: Vec<CredibleInterval>,
    #[schemars(with = "Option<f64>")]
    pub reed_muench: f64,
    #[schemars(with = "Option<f64>")]
    pub spearman_kaerber: f64,
}

/// Failure to evaluate one assay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Assay(#[from] AssayError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),
}

impl From<EvaluateError> for midsin_common::Error {
    fn from(err: EvaluateError) -> Self {
        match err {
            EvaluateError::Assay(e) => e.into(),
            EvaluateError::Estimator(e) => midsin_common::Error::NonConvergence {
                stage: e.stage().to_string(),
                detail: e.to_string(),
            },
        }
    }
}

/// Evaluate one assay.
pub fn evaluate(
    input: &AssayInput,
    settings: &EstimatorSettings,
) -> Result<ResultRecord, EvaluateError> {
    debug!(
        target: event_names::EVALUATE_STARTED,
        stage = %Stage::Model,
        label = input.label.as_deref().unwrap_or(""),
        columns = input.total_wells.len(),
        "evaluating assay"
    );
    let model = AssayModel::from_input(input)?;
    if model.state().is_degenerate() {
        info!(
            target: event_names::ASSAY_DEGENERATE,
            stage = %Stage::Model,
            label = input.label.as_deref().unwrap_or(""),
            state = %model.state(),
            "assay at a limit of detection"
        );
    }

    let posterior = PosteriorEstimator::new(&model, settings).sample()?;

    let dilutions = model.log_dilutions();
    let classical = classical::estimate(&model.log_doses(), model.infected_wells(), model.total_wells());
    if !model.state().is_degenerate()
        && !(classical.reed_muench.is_finite() && classical.spearman_kaerber.is_finite())
    {
        debug!(
            target: event_names::CLASSICAL_UNDEFINED,
            stage = %Stage::Classical,
            reed_muench = classical.reed_muench,
            spearman_kaerber = classical.spearman_kaerber,
            "classical estimate undefined"
        );
    }

    debug!(
        target: event_names::EVALUATE_FINISHED,
        stage = %Stage::Posterior,
        state = %model.state(),
        mode = posterior.mode,
        grid_points = posterior.grid.len(),
        "assay evaluated"
    );

    Ok(ResultRecord {
        schema_version: SCHEMA_VERSION.to_string(),
        label: input.label.clone(),
        state: model.state(),
        posterior,
        reed_muench: classical.reed_muench,
        spearman_kaerber: classical.spearman_kaerber,
        dilutions,
        inoculum_volume: model.inoculum_volume(),
        dilution_factor: model.dilution_factor(),
        infected_wells: model.infected_wells().to_vec(),
        total_wells: model.total_wells().to_vec(),
    })
}

/// Evaluate with built-in settings.
pub fn evaluate_default(input: &AssayInput) -> Result<ResultRecord, EvaluateError> {
    evaluate(input, &EstimatorSettings::default())
}

/// Evaluate every assay independently; one failure never affects the rest.
pub fn evaluate_batch(
    inputs: &[AssayInput],
    settings: &EstimatorSettings,
) -> Vec<Result<ResultRecord, EvaluateError>> {
    inputs.iter().map(|input| evaluate(input, settings)).collect()
}

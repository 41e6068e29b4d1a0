//! midsin core library
//!
//! Endpoint-dilution (TCID50) titre estimation:
//! - Assay validation and the single-hit likelihood model
//! - Bayesian posterior over log10 SIN/mL with narrowest credible intervals
//! - Reed-Muench and Spearman-Kärber classical estimates
//! - Plot data, the batch CSV layout, output rendering and JSON schemas
//!
//! The binary entry point is in `main.rs`.

pub mod assay;
pub mod classical;
pub mod curves;
pub mod evaluate;
pub mod exit_codes;
pub mod logging;
pub mod output;
pub mod posterior;
pub mod records;
pub mod schema;

pub use assay::{AssayError, AssayInput, AssayModel, AssayState};
pub use classical::ClassicalEstimate;
pub use evaluate::{evaluate, evaluate_batch, evaluate_default, EvaluateError, ResultRecord, ResultSummary};
pub use exit_codes::ExitCode;
pub use posterior::{CredibleInterval, EstimatorError, PosteriorEstimator, PosteriorSample, PosteriorStage};

//! Event vocabulary for structured logs.
//!
//! Every event carries a stable name (used as the tracing target) and the
//! evaluation stage it belongs to.

use serde::{Deserialize, Serialize};

/// Evaluation stage an event was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Startup, settings resolution, record parsing.
    Parse,
    /// Assay validation and state classification.
    Model,
    /// Mode, grid, cdf and credible intervals.
    Posterior,
    /// Reed-Muench and Spearman-Kärber.
    Classical,
    /// Formatting and writing results.
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Parse => "parse",
            Stage::Model => "model",
            Stage::Posterior => "posterior",
            Stage::Classical => "classical",
            Stage::Output => "output",
        };
        write!(f, "{}", s)
    }
}

/// Stable event names.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";
    pub const CONFIG_LOADED: &str = "config.loaded";

    pub const RECORDS_PARSED: &str = "records.parsed";

    pub const EVALUATE_STARTED: &str = "evaluate.started";
    pub const EVALUATE_FINISHED: &str = "evaluate.finished";
    pub const ASSAY_DEGENERATE: &str = "assay.degenerate";

    pub const POSTERIOR_MODE: &str = "posterior.mode";
    pub const POSTERIOR_GRID: &str = "posterior.grid";
    pub const POSTERIOR_BOUNDS: &str = "posterior.bounds";

    pub const CLASSICAL_UNDEFINED: &str = "classical.undefined";

    pub const BATCH_ROW_FAILED: &str = "batch.row_failed";
    pub const BATCH_FINISHED: &str = "batch.finished";

    pub const OUTPUT_WRITTEN: &str = "output.written";
}

/// Correlation data attached to every event of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }

    /// Context with a freshly generated run ID.
    pub fn generate() -> Self {
        LogContext::new(super::generate_run_id())
    }
}

//! Errors reported by the scalar solvers.

use thiserror::Error;

/// Failure modes of the root finder and the scalar minimizers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("root is not bracketed: f({a}) = {fa}, f({b}) = {fb}")]
    NotBracketed { a: f64, b: f64, fa: f64, fb: f64 },

    #[error("could not bracket a minimum starting from [{xa}, {xb}]")]
    NoMinimumBracket { xa: f64, xb: f64 },

    #[error("{method} did not converge within {iterations} iterations")]
    MaxIterations {
        method: &'static str,
        iterations: usize,
    },

    #[error("objective is not finite at x = {x}")]
    NonFinite { x: f64 },

    #[error("invalid search interval [{lower}, {upper}]")]
    InvalidInterval { lower: f64, upper: f64 },
}

impl SolverError {
    /// Whether the solver ran out of iterations (as opposed to being handed
    /// an unusable problem).
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, SolverError::MaxIterations { .. })
    }
}

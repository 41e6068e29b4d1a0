//! Settings validation errors and semantic validation.

use thiserror::Error;

use crate::settings::{EstimatorSettings, GridSettings, SolverSettings};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Settings validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

/// Validate estimator settings semantically.
pub fn validate_settings(settings: &EstimatorSettings) -> ValidationResult<()> {
    if !midsin_common::schema::is_compatible(&settings.schema_version) {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    validate_coverages(&settings.coverages)?;
    validate_grid(&settings.grid)?;
    validate_solver(&settings.solver)?;
    Ok(())
}

fn validate_coverages(coverages: &[f64]) -> ValidationResult<()> {
    if coverages.is_empty() {
        return Err(invalid("coverages", "Must list at least one coverage".into()));
    }
    for (i, &c) in coverages.iter().enumerate() {
        if !(c > 0.0 && c < 1.0) {
            return Err(invalid(
                &format!("coverages[{}]", i),
                format!("Must be in (0, 1), got {}", c),
            ));
        }
    }
    if let Some(i) = coverages.windows(2).position(|w| w[1] <= w[0]) {
        return Err(invalid(
            &format!("coverages[{}]", i + 1),
            format!(
                "Must be strictly increasing, got {} after {}",
                coverages[i + 1],
                coverages[i]
            ),
        ));
    }
    Ok(())
}

fn validate_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(field, format!("Must be positive, got {}", value)));
    }
    Ok(())
}

fn validate_grid(grid: &GridSettings) -> ValidationResult<()> {
    validate_positive("grid.fine_step", grid.fine_step)?;
    validate_positive("grid.coarse_step", grid.coarse_step)?;
    validate_positive("grid.fine_half_width", grid.fine_half_width)?;
    validate_positive("grid.coarse_width", grid.coarse_width)?;
    validate_positive("grid.bracket_decades", grid.bracket_decades)?;

    if grid.fine_step > grid.coarse_step {
        return Err(invalid(
            "grid.fine_step",
            format!(
                "Must not exceed grid.coarse_step ({}), got {}",
                grid.coarse_step, grid.fine_step
            ),
        ));
    }
    if grid.degenerate_points < 2 {
        return Err(invalid(
            "grid.degenerate_points",
            format!("Must be at least 2, got {}", grid.degenerate_points),
        ));
    }
    for (field, value) in [
        ("grid.lower_target", grid.lower_target),
        ("grid.upper_target", grid.upper_target),
    ] {
        if !(value > 0.0 && value < 1.0) {
            return Err(invalid(field, format!("Must be in (0, 1), got {}", value)));
        }
    }
    if grid.lower_target >= grid.upper_target {
        return Err(invalid(
            "grid.lower_target",
            format!(
                "Must be below grid.upper_target ({}), got {}",
                grid.upper_target, grid.lower_target
            ),
        ));
    }
    Ok(())
}

fn validate_solver(solver: &SolverSettings) -> ValidationResult<()> {
    validate_positive("solver.root.xtol", solver.root.xtol)?;
    if !(solver.root.rtol.is_finite() && solver.root.rtol >= 0.0) {
        return Err(invalid(
            "solver.root.rtol",
            format!("Must be non-negative, got {}", solver.root.rtol),
        ));
    }
    validate_positive("solver.mode.tol", solver.mode.tol)?;
    validate_positive("solver.mode.grow_limit", solver.mode.grow_limit)?;
    validate_positive("solver.interval.xatol", solver.interval.xatol)?;

    for (field, value) in [
        ("solver.root.max_iter", solver.root.max_iter),
        ("solver.mode.max_iter", solver.mode.max_iter),
        ("solver.mode.max_bracket_iter", solver.mode.max_bracket_iter),
        ("solver.interval.max_evaluations", solver.interval.max_evaluations),
    ] {
        if value == 0 {
            return Err(invalid(field, "Must be at least 1".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ValidationError) -> String {
        match err {
            ValidationError::InvalidValue { field, .. } => field,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        validate_settings(&EstimatorSettings::default()).unwrap();
    }

    #[test]
    fn rejects_other_major_version() {
        let s = EstimatorSettings {
            schema_version: "2.0.0".into(),
            ..EstimatorSettings::default()
        };
        assert!(matches!(
            validate_settings(&s).unwrap_err(),
            ValidationError::VersionMismatch { .. }
        ));
    }

    #[test]
    fn rejects_bad_coverages() {
        for (coverages, field) in [
            (vec![], "coverages"),
            (vec![0.95, 0.68], "coverages[1]"),
            (vec![0.68, 0.68], "coverages[1]"),
            (vec![0.0, 0.5], "coverages[0]"),
            (vec![0.5, 1.0], "coverages[1]"),
        ] {
            let s = EstimatorSettings {
                coverages,
                ..EstimatorSettings::default()
            };
            assert_eq!(field_of(validate_settings(&s).unwrap_err()), field);
        }
    }

    #[test]
    fn rejects_fine_step_above_coarse() {
        let mut s = EstimatorSettings::default();
        s.grid.fine_step = 0.05;
        assert_eq!(field_of(validate_settings(&s).unwrap_err()), "grid.fine_step");
    }

    #[test]
    fn rejects_inverted_targets() {
        let mut s = EstimatorSettings::default();
        s.grid.lower_target = 0.99;
        s.grid.upper_target = 0.5;
        assert_eq!(
            field_of(validate_settings(&s).unwrap_err()),
            "grid.lower_target"
        );
    }

    #[test]
    fn rejects_too_few_degenerate_points() {
        let mut s = EstimatorSettings::default();
        s.grid.degenerate_points = 1;
        assert_eq!(
            field_of(validate_settings(&s).unwrap_err()),
            "grid.degenerate_points"
        );
    }

    #[test]
    fn rejects_non_positive_tolerances() {
        let mut s = EstimatorSettings::default();
        s.solver.interval.xatol = 0.0;
        assert_eq!(
            field_of(validate_settings(&s).unwrap_err()),
            "solver.interval.xatol"
        );

        let mut s = EstimatorSettings::default();
        s.solver.mode.max_iter = 0;
        assert_eq!(
            field_of(validate_settings(&s).unwrap_err()),
            "solver.mode.max_iter"
        );
    }
}

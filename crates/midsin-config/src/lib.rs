//! midsin estimator settings.
//!
//! This crate provides:
//! - Typed settings for the posterior grid, coverages, and solvers
//! - Settings file resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation

pub mod resolve;
pub mod settings;
pub mod validate;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use resolve::{resolve_settings_path, ConfigSource};
pub use settings::{EstimatorSettings, GridSettings, SolverSettings};
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for settings files.
pub const CONFIG_SCHEMA_VERSION: &str = midsin_common::SCHEMA_VERSION;

/// Failure to produce usable settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// Whether the file exists but its content is wrong (as opposed to
    /// missing or unreadable).
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            ConfigError::Invalid {
                source: ValidationError::InvalidValue { .. } | ValidationError::VersionMismatch { .. },
                ..
            }
        )
    }
}

impl From<ConfigError> for midsin_common::Error {
    fn from(err: ConfigError) -> Self {
        if err.is_semantic() {
            midsin_common::Error::InvalidSettings(err.to_string())
        } else {
            midsin_common::Error::Config(err.to_string())
        }
    }
}

/// Settings together with where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: EstimatorSettings,
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
}

/// Read and validate one settings file.
pub fn load_settings_file(path: &Path) -> Result<EstimatorSettings, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let invalid = |source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    };
    let settings = EstimatorSettings::from_file(path).map_err(invalid)?;
    validate_settings(&settings).map_err(invalid)?;
    Ok(settings)
}

/// Resolve, read and validate the settings, falling back to defaults when no
/// file is found.
pub fn load_settings(cli_path: Option<&Path>) -> Result<LoadedSettings, ConfigError> {
    let (path, source) = resolve_settings_path(cli_path);
    let settings = match &path {
        Some(p) => load_settings_file(p)?,
        None => EstimatorSettings::default(),
    };
    Ok(LoadedSettings {
        settings,
        source,
        path,
    })
}

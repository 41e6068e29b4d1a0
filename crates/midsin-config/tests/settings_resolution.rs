//! Settings loading and resolution tests against real files.
//!
//! Covers:
//! - Resolution order (CLI > MIDSIN_CONFIG > MIDSIN_CONFIG_DIR)
//! - Validation failures surfacing as ConfigError
//! - Defaults when nothing is found

use midsin_config::resolve::{ConfigSource, ENV_CONFIG_DIR, ENV_SETTINGS_PATH};
use midsin_config::{load_settings, load_settings_file, ConfigError, EstimatorSettings};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f()
}

fn write_settings(dir: &Path, coverages: &[f64]) -> PathBuf {
    fs::create_dir_all(dir).expect("create settings dir");
    let path = dir.join("settings.json");
    let settings = EstimatorSettings {
        coverages: coverages.to_vec(),
        ..EstimatorSettings::default()
    };
    fs::write(&path, settings.to_json_pretty()).expect("write settings");
    path
}

#[test]
fn cli_path_wins_over_environment() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_SETTINGS_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let cli = write_settings(&temp.path().join("cli"), &[0.5]);
        let from_env = write_settings(&temp.path().join("env"), &[0.9]);
        env::set_var(ENV_SETTINGS_PATH, &from_env);

        let loaded = load_settings(Some(&cli)).expect("load");
        assert_eq!(loaded.source, ConfigSource::CliArgument);
        assert_eq!(loaded.settings.coverages, vec![0.5]);
        assert_eq!(loaded.path.as_deref(), Some(cli.as_path()));
    });
}

#[test]
fn env_path_wins_over_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_SETTINGS_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let direct = write_settings(&temp.path().join("direct"), &[0.8]);
        let dir = temp.path().join("dir");
        write_settings(&dir, &[0.99]);
        env::set_var(ENV_SETTINGS_PATH, &direct);
        env::set_var(ENV_CONFIG_DIR, &dir);

        let loaded = load_settings(None).expect("load");
        assert_eq!(loaded.source, ConfigSource::Environment);
        assert_eq!(loaded.settings.coverages, vec![0.8]);
    });
}

#[test]
fn config_dir_is_used_when_direct_path_is_missing() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_SETTINGS_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("dir");
        write_settings(&dir, &[0.25, 0.75]);
        env::set_var(ENV_SETTINGS_PATH, temp.path().join("missing.json"));
        env::set_var(ENV_CONFIG_DIR, &dir);

        let loaded = load_settings(None).expect("load");
        assert_eq!(loaded.source, ConfigSource::Environment);
        assert_eq!(loaded.settings.coverages, vec![0.25, 0.75]);
    });
}

#[test]
fn missing_cli_path_is_an_error() {
    let temp = TempDir::new().expect("temp dir");
    let missing = temp.path().join("nope.json");
    let err = load_settings(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(!err.is_semantic());
}

#[test]
fn semantic_errors_name_the_file() {
    let temp = TempDir::new().expect("temp dir");
    let path = write_settings(temp.path(), &[0.95, 0.68]);
    let err = load_settings_file(&path).unwrap_err();
    assert!(err.is_semantic());
    let message = err.to_string();
    assert!(message.contains("settings.json"), "{message}");
    assert!(message.contains("coverages[1]"), "{message}");

    let common: midsin_common::Error = err.into();
    assert_eq!(common.code(), 21);
}

#[test]
fn parse_errors_are_not_semantic() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("settings.json");
    fs::write(&path, "{ \"coverages\": [0.5,").expect("write");
    let err = load_settings_file(&path).unwrap_err();
    assert!(!err.is_semantic());

    let common: midsin_common::Error = err.into();
    assert_eq!(common.code(), 20);
}

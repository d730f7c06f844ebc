//! Unit tests for the Figment configuration loader
//!
//! # Safety
//!
//! Tests use `unsafe` blocks for `env::set_var`/`env::remove_var` because
//! Rust 2024 edition requires this for environment variable mutations.
//! Every test here holds [`ENV_LOCK`], since `load` reads the environment.

use std::env;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use modwire_domain::error::Error;
use modwire_domain::value_objects::ConflictPolicy;
use modwire_infrastructure::config::{AppConfig, ConfigLoader};
use tempfile::{NamedTempFile, TempDir};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Helper to set env var safely
fn set_env(key: &str, value: &str) {
    // SAFETY: callers hold ENV_LOCK
    unsafe {
        env::set_var(key, value);
    }
}

/// Helper to remove env var safely
fn remove_env(key: &str) {
    // SAFETY: callers hold ENV_LOCK
    unsafe {
        env::remove_var(key);
    }
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_without_file() {
    let _env = env_lock();
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .load()
        .unwrap();

    assert_eq!(config, AppConfig::default());
    assert_eq!(config.container.conflict_policy, ConflictPolicy::FirstImport);
    assert!(!config.container.eager);
}

#[test]
fn test_toml_file_overrides_defaults() {
    let _env = env_lock();
    let file = config_file(
        r#"
[logging]
level = "debug"

[container]
conflict_policy = "strict"
eager = true

[modules.config]
folder = "./config"
"#,
    );

    let config = ConfigLoader::new().with_config_path(file.path()).load().unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.container.conflict_policy, ConflictPolicy::Strict);
    assert!(config.container.eager);
    let module = config.module_config("config");
    assert_eq!(module.get("folder").and_then(|v| v.as_str()), Some("./config"));
    assert!(config.module_config("absent").is_empty());
}

#[test]
fn test_env_overrides_file() {
    let _env = env_lock();
    let file = config_file("[container]\nconflict_policy = \"strict\"\n");
    set_env("MODWIRE_CONTAINER__CONFLICT_POLICY", "last_import");
    set_env("MODWIRE_LOGGING__LEVEL", "warn");

    let result = ConfigLoader::new().with_config_path(file.path()).load();

    remove_env("MODWIRE_CONTAINER__CONFLICT_POLICY");
    remove_env("MODWIRE_LOGGING__LEVEL");

    let config = result.unwrap();
    assert_eq!(config.container.conflict_policy, ConflictPolicy::LastImport);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_custom_env_prefix() {
    let _env = env_lock();
    set_env("WIRING_CONTAINER__EAGER", "true");

    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .with_env_prefix("WIRING")
        .with_config_path(dir.path().join("absent.toml"))
        .load();

    remove_env("WIRING_CONTAINER__EAGER");
    assert!(result.unwrap().container.eager);
}

#[test]
fn test_invalid_log_level_rejected() {
    let _env = env_lock();
    let file = config_file("[logging]\nlevel = \"loud\"\n");

    let err = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .unwrap_err();

    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_malformed_file_rejected() {
    let _env = env_lock();
    let file = config_file("[container\n");

    let err = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .unwrap_err();

    assert!(err.to_string().contains("Failed to extract configuration"));
}

#[test]
fn test_save_and_reload_round_trip() {
    let _env = env_lock();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("modwire.toml");
    let mut config = AppConfig::default().with_module_config(
        "config",
        serde_json::json!({ "folder": "./config" }),
    );
    config.container.eager = true;

    let loader = ConfigLoader::new().with_config_path(&path);
    loader.save_to_file(&config, &path).unwrap();
    let reloaded = loader.reload().unwrap();

    assert_eq!(reloaded, config);
    assert_eq!(loader.config_path(), Some(path.as_path()));
}

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use findex::config::{Config, ConfigError};
use findex::scanner::HashAlgorithm;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

use crate::{clear_env, ENV_MUTEX};

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
hash_algorithm = "sha256"
lock_timeout_ms = 1500
follow_symlinks = true
ignore_patterns = ["*.tmp", "node_modules/"]
"#,
    )
    .unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.hash_algorithm, Some(HashAlgorithm::Sha256));
    assert_eq!(config.lock_timeout(), Duration::from_millis(1500));
    assert!(config.follow_symlinks);
    assert!(!config.skip_hidden);
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "node_modules/"]);
}

#[test]
fn test_config_partial_toml_keeps_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "skip_hidden = true\n").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert!(config.skip_hidden);
    assert_eq!(config.hash_algorithm, None);
    assert_eq!(config.lock_timeout_ms, 0);
}

#[test]
fn test_config_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "lock_timeout_ms = 100\nhash_algorithm = \"sha1\"\n").unwrap();

    std::env::set_var("FINDEX_LOCK_TIMEOUT_MS", "750");
    std::env::set_var("FINDEX_HASH_ALGORITHM", "blake3");

    let config = Config::load(Some(&config_path));
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.lock_timeout_ms, 750);
    assert_eq!(config.hash_algorithm, Some(HashAlgorithm::Blake3));
}

#[test]
fn test_config_env_prefix_only() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    std::env::set_var("FINDEX_SKIP_HIDDEN", "true");
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("FINDEX_").split("__"));
    let config: Result<Config, _> = figment.extract();
    clear_env();

    assert!(config.unwrap().skip_hidden);
}

#[test]
fn test_config_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "lock_timeout_ms = \"soon\"").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let result: Result<Config, _> = figment.extract();
    assert!(result.is_err());
}

#[test]
fn test_config_load_reports_invalid_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_algorithm = \"md5\"").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_config_load_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let err = Config::load(Some(&temp_dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_default_path_is_toml() {
    if let Some(path) = Config::default_path() {
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }
}

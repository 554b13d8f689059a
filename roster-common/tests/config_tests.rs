//! Tests for bootstrap configuration and root folder resolution
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate ROSTER_* variables are marked with #[serial].

use roster_common::config::{
    default_root_folder, resolve_root_folder, RootFolder, TomlConfig, ENV_CONFIG,
    ENV_ROOT_FOLDER, ENV_TOKEN_SECRET,
};
use roster_common::PlanTerms;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults_are_valid() {
    let config = TomlConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.port, 5740);
    assert_eq!(config.database_file, "roster.db");
    assert_eq!(config.logging.level, "info");
    assert!(config.auth.token_secret.is_none());
    assert!(config.plans.terms("basic").is_some());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 8080

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.auth.token_ttl_secs, 86_400);
}

#[test]
fn test_plans_replace_default_table() {
    let config = TomlConfig::from_toml_str(
        r#"
        [plans.trial]
        students_allowed = 10
        duration_days = 14
        "#,
    )
    .unwrap();

    assert_eq!(
        config.plans.terms("trial"),
        Some(&PlanTerms { students_allowed: 10, duration_days: 14 })
    );
    assert!(config.plans.terms("basic").is_none());
}

#[test]
fn test_invalid_values_rejected() {
    assert!(TomlConfig::from_toml_str("max_upload_bytes = 0").is_err());
    assert!(TomlConfig::from_toml_str("[auth]\ntoken_ttl_secs = 0").is_err());
    assert!(TomlConfig::from_toml_str("[auth]\ntoken_secret = \"  \"").is_err());
    assert!(TomlConfig::from_toml_str("database_file = \"\"").is_err());
    assert!(TomlConfig::from_toml_str("port = \"not a number\"").is_err());
}

#[test]
fn test_plan_duration_past_year_9999_rejected() {
    let result = TomlConfig::from_toml_str(
        r#"
        [plans.forever]
        students_allowed = 10
        duration_days = 3000000
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let result = TomlConfig::load(Path::new("/nonexistent/roster/config.toml"));
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_load_or_default_reads_env_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 9001\n").unwrap();

    env::set_var(ENV_CONFIG, &path);
    let config = TomlConfig::load_or_default(None).unwrap();
    env::remove_var(ENV_CONFIG);

    assert_eq!(config.port, 9001);
}

#[test]
#[serial]
fn test_explicit_path_beats_env_config() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.toml");
    let from_env = dir.path().join("env.toml");
    std::fs::write(&explicit, "port = 7001\n").unwrap();
    std::fs::write(&from_env, "port = 7002\n").unwrap();

    env::set_var(ENV_CONFIG, &from_env);
    let config = TomlConfig::load_or_default(Some(&explicit)).unwrap();
    env::remove_var(ENV_CONFIG);

    assert_eq!(config.port, 7001);
}

#[test]
#[serial]
fn test_root_folder_priority() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    // CLI argument wins over everything
    env::set_var(ENV_ROOT_FOLDER, "/from/env");
    assert_eq!(
        resolve_root_folder(Some(Path::new("/from/cli")), &config),
        PathBuf::from("/from/cli")
    );

    // Environment wins over TOML
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/env"));

    // TOML wins over the compiled default
    env::remove_var(ENV_ROOT_FOLDER);
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));

    // Compiled default as last resort
    assert_eq!(
        resolve_root_folder(None, &TomlConfig::default()),
        default_root_folder()
    );
}

#[test]
#[serial]
fn test_token_secret_env_overrides_toml() {
    let mut config = TomlConfig::default();
    config.auth.token_secret = Some("toml-secret".to_string());

    env::remove_var(ENV_TOKEN_SECRET);
    assert_eq!(config.token_secret().as_deref(), Some("toml-secret"));

    env::set_var(ENV_TOKEN_SECRET, "env-secret");
    assert_eq!(config.token_secret().as_deref(), Some("env-secret"));
    env::remove_var(ENV_TOKEN_SECRET);
}

#[test]
fn test_root_folder_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().join("roster"));

    root.ensure_directories().unwrap();

    assert!(root.path().is_dir());
    assert!(root.uploads_dir().is_dir());
    assert!(root.staging_dir().is_dir());
    assert_eq!(root.database_path("roster.db"), dir.path().join("roster").join("roster.db"));

    // Second call is a no-op
    root.ensure_directories().unwrap();
}

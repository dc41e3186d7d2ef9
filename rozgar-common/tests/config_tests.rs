//! Unit tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate environment variables are marked with #[serial].

use rozgar_common::config::{
    default_config_path, env_flag, env_var, load_toml, load_toml_or_default, ConfigOrigin,
    LoggingConfig,
};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let (config, origin): (SampleConfig, _) = load_toml_or_default(&path).unwrap();
    assert_eq!(config, SampleConfig::default());
    assert_eq!(config.logging.level, "info");
    assert!(origin.is_defaults());
    assert_eq!(origin, ConfigOrigin::Defaults(path.clone()));
    assert_eq!(origin.path(), path.as_path());
}

#[test]
fn test_existing_file_is_parsed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 6000\n[logging]\nlevel = \"debug\"").unwrap();

    let (config, origin): (SampleConfig, _) = load_toml_or_default(file.path()).unwrap();
    assert_eq!(origin, ConfigOrigin::File(file.path().to_path_buf()));
    assert!(!origin.is_defaults());
    assert_eq!(config.port, Some(6000));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.file.is_none());
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    let result: rozgar_common::Result<SampleConfig> = load_toml(file.path());
    assert!(matches!(result, Err(rozgar_common::Error::Config(_))));
}

#[test]
fn test_default_config_path_names_module() {
    let path = default_config_path("rozgar-dd");
    assert!(path.to_string_lossy().ends_with("rozgar-dd.toml"));
}

#[test]
#[serial]
fn test_env_var_ignores_blank_values() {
    env::set_var("ROZGAR_TEST_BLANK", "   ");
    assert_eq!(env_var("ROZGAR_TEST_BLANK"), None);

    env::set_var("ROZGAR_TEST_BLANK", " value ");
    assert_eq!(env_var("ROZGAR_TEST_BLANK").as_deref(), Some("value"));

    env::remove_var("ROZGAR_TEST_BLANK");
    assert_eq!(env_var("ROZGAR_TEST_BLANK"), None);
}

#[test]
#[serial]
fn test_env_flag_parsing() {
    for (raw, expected) in [("true", Some(true)), ("YES", Some(true)), ("0", Some(false)), ("off", Some(false)), ("maybe", None)] {
        env::set_var("ROZGAR_TEST_FLAG", raw);
        assert_eq!(env_flag("ROZGAR_TEST_FLAG"), expected, "value {}", raw);
    }
    env::remove_var("ROZGAR_TEST_FLAG");
    assert_eq!(env_flag("ROZGAR_TEST_FLAG"), None);
}

//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{BridgeConfig, LogLevel};
use std::path::Path;
use wv2_common::ConfigError;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let err = load_from_path(Path::new("/tmp/nonexistent_wv2_config.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[environment]
language = "fr-FR"

[page.settings]
are_dev_tools_enabled = false
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.environment.language, "fr-FR");
    assert!(!config.page.settings.are_dev_tools_enabled);
    // Defaults preserved
    assert!(config.page.settings.is_script_enabled);
    assert!(config.environment.user_data_folder.is_empty());
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn unknown_log_level_is_a_parse_error() {
    let err = parse("[logging]\nlevel = \"VERBOSE\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn every_log_level_parses() {
    for (text, level) in [
        ("TRACE", LogLevel::Trace),
        ("DEBUG", LogLevel::Debug),
        ("INFO", LogLevel::Info),
        ("WARN", LogLevel::Warn),
        ("ERROR", LogLevel::Error),
    ] {
        let config = parse(&format!("[logging]\nlevel = \"{text}\"\n")).unwrap();
        assert_eq!(config.logging.level, level);
    }
}

#[test]
fn invalid_values_are_returned_as_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[environment]\nlanguage = \"not a tag\"\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.environment.language, "not a tag");
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path_in(dir.path());

    assert!(create_default_config(&path).unwrap());
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn existing_config_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"WARN\"\n").unwrap();

    assert!(!create_default_config(&path).unwrap());
    assert_eq!(load_from_path(&path).unwrap().logging.level, LogLevel::Warn);
}

#[test]
fn empty_file_yields_defaults() {
    assert_eq!(parse("").unwrap(), BridgeConfig::default());
}

#[test]
fn config_lives_in_wv2_folder() {
    let path = config_path_in(Path::new("base"));
    assert_eq!(path, Path::new("base").join("wv2").join("config.toml"));

    if let Ok(path) = default_config_path() {
        assert!(path.ends_with(Path::new("wv2").join("config.toml")));
    }
}

//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    assert!(validate(&BridgeConfig::default()).is_ok());
}

#[test]
fn accepts_common_language_tags() {
    for tag in ["en", "en-US", "zh-Hans-CN", "sr-Latn", "es-419"] {
        let mut config = BridgeConfig::default();
        config.environment.language = tag.into();
        assert!(validate(&config).is_ok(), "{tag} should validate");
    }
}

#[test]
fn catches_malformed_language() {
    let mut config = BridgeConfig::default();
    config.environment.language = "english please".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("environment.language"));
}

#[test]
fn catches_trailing_dash_in_language() {
    let mut config = BridgeConfig::default();
    config.environment.language = "en-".into();
    assert!(validate(&config).is_err());
}

#[test]
fn catches_interior_nul() {
    let mut config = BridgeConfig::default();
    config.environment.user_data_folder = "C:\\data\0hidden".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("environment.user_data_folder"));
    assert!(err.contains("byte 7"));
}

#[test]
fn collects_every_problem() {
    let mut config = BridgeConfig::default();
    config.environment.additional_browser_arguments = "--a\0".into();
    config.environment.language = "??".into();
    let err = validate(&config).unwrap_err();
    assert!(matches!(err, wv2_common::ConfigError::ValidationError(_)));

    let message = err.to_string();
    assert!(message.contains("environment.additional_browser_arguments"));
    assert!(message.contains("environment.language"));
    assert!(message.contains("; "));
}

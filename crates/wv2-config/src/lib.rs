//! wv2 configuration.
//!
//! Provides TOML-based configuration for environment creation, initial page
//! settings and logging. All sections use defaults so partial configs work
//! out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use wv2_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{BridgeConfig, EnvironmentConfig, LogLevel, LoggingConfig, PageConfig};

use std::path::Path;
use wv2_common::ConfigError;

/// Load and validate config from the platform default path.
///
/// Creates a default `config.toml` in the OS config directory if none exists.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &BridgeConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&BridgeConfig::default());
        assert!(json.contains("\"environment\""));
        assert!(json.contains("\"page\""));
        assert!(json.contains("\"settings\""));
        assert!(json.contains("\"logging\""));
        assert!(json.contains("\"INFO\""));
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = config_to_json(&BridgeConfig::default());
        let parsed: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, BridgeConfig::default());
    }

    #[test]
    fn load_config_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[environment]\nlanguage = \"x\"\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_config_from_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"DEBUG\"\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
    }
}

//! Where the config file lives, and writing the commented default.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wv2_common::ConfigError;

use super::template::default_config_toml;

const CONFIG_DIR: &str = "wv2";
const CONFIG_FILE: &str = "config.toml";

/// The per-user config file.
///
/// On Windows: `%APPDATA%\wv2\config.toml`
/// On macOS: `~/Library/Application Support/wv2/config.toml`
/// On Linux: `$XDG_CONFIG_HOME/wv2/config.toml` (usually `~/.config`)
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| config_path_in(&dir))
        .ok_or_else(|| ConfigError::ParseError("no per-user config directory on this platform".into()))
}

/// `wv2/config.toml` under `config_dir`.
pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Write the commented default config to `path`, creating parent directories.
///
/// An existing file is never overwritten. Returns whether a file was written.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    let write_failed = |e: std::io::Error| {
        ConfigError::ParseError(format!("failed to write {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("keeping existing config at {}", path.display());
            return Ok(false);
        }
        Err(e) => return Err(write_failed(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_failed)?;

    info!("created default config at {}", path.display());
    Ok(true)
}

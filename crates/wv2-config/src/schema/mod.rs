//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod environment;
mod logging;
mod page;

pub use environment::*;
pub use logging::*;
pub use page::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge and the probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub environment: EnvironmentConfig,
    pub page: PageConfig,
    pub logging: LoggingConfig,
}

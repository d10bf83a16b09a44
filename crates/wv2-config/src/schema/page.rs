//! Page settings applied after the page is first obtained.

use serde::{Deserialize, Serialize};
use wv2_common::Settings;

/// `[page]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub settings: Settings,
}

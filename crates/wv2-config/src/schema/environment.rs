//! Environment creation settings.

use serde::{Deserialize, Serialize};
use wv2_common::EnvironmentOptions;

/// `[environment]` section. Empty strings mean "leave the runtime default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Folder holding a fixed-version runtime; empty uses the installed one.
    pub browser_executable_folder: String,
    pub user_data_folder: String,
    pub additional_browser_arguments: String,
    /// BCP 47 tag such as `en-US`.
    pub language: String,
    pub target_compatible_browser_version: String,
    pub allow_single_sign_on_using_os_primary_account: bool,
}

impl EnvironmentConfig {
    /// Options record passed to environment creation.
    pub fn to_options(&self) -> EnvironmentOptions {
        EnvironmentOptions::new(
            &self.additional_browser_arguments,
            &self.language,
            &self.target_compatible_browser_version,
            self.allow_single_sign_on_using_os_primary_account,
        )
    }

    /// `(field name, value)` for every text field, in declaration order.
    pub fn text_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("browser_executable_folder", &self.browser_executable_folder),
            ("user_data_folder", &self.user_data_folder),
            (
                "additional_browser_arguments",
                &self.additional_browser_arguments,
            ),
            ("language", &self.language),
            (
                "target_compatible_browser_version",
                &self.target_compatible_browser_version,
            ),
        ]
    }
}

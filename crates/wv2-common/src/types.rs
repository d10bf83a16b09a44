use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wide::WideString;

/// Controller bounds in parent-window pixels.
///
/// No ordering is enforced between the edges; values pass through to the
/// native layer verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Bounds anchored at the origin with the given size.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Platform window handle the controller is parented to (an `HWND` on Windows).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParentWindow(pub isize);

/// Snapshot of the page's feature toggles.
///
/// Read and written as a whole; the native API exposes one getter and one
/// setter per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub is_script_enabled: bool,
    pub is_web_message_enabled: bool,
    pub are_default_script_dialogs_enabled: bool,
    pub is_status_bar_enabled: bool,
    pub are_dev_tools_enabled: bool,
    pub are_default_context_menus_enabled: bool,
    pub is_zoom_control_enabled: bool,
    pub is_built_in_error_page_enabled: bool,
}

impl Default for Settings {
    /// Everything enabled, matching a freshly created page.
    fn default() -> Self {
        Self {
            is_script_enabled: true,
            is_web_message_enabled: true,
            are_default_script_dialogs_enabled: true,
            is_status_bar_enabled: true,
            are_dev_tools_enabled: true,
            are_default_context_menus_enabled: true,
            is_zoom_control_enabled: true,
            is_built_in_error_page_enabled: true,
        }
    }
}

/// Options for environment creation.
///
/// An empty text field means "leave the runtime default alone": the
/// corresponding native setter is never called for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOptions {
    pub additional_browser_arguments: WideString,
    pub language: WideString,
    pub target_compatible_browser_version: WideString,
    pub allow_single_sign_on_using_os_primary_account: bool,
}

impl EnvironmentOptions {
    pub fn new(
        additional_browser_arguments: &str,
        language: &str,
        target_compatible_browser_version: &str,
        allow_single_sign_on_using_os_primary_account: bool,
    ) -> Self {
        Self {
            additional_browser_arguments: additional_browser_arguments.into(),
            language: language.into(),
            target_compatible_browser_version: target_compatible_browser_version.into(),
            allow_single_sign_on_using_os_primary_account,
        }
    }
}

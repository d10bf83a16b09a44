use std::fmt;

use wv2_common::{from_native, WideString};

use super::Page;
use crate::native::WebMessageReceivedArgs;

/// Payload of a navigation continuation.
pub struct NavigationCompleted {
    /// The page the navigation ran on.
    pub page: Page,
    pub is_success: bool,
    /// Native web error status; zero on success.
    pub web_error_status: i32,
    pub navigation_id: u64,
}

impl fmt::Debug for NavigationCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationCompleted")
            .field("is_success", &self.is_success)
            .field("web_error_status", &self.web_error_status)
            .field("navigation_id", &self.navigation_id)
            .finish_non_exhaustive()
    }
}

/// A message posted by page script through `window.chrome.webview.postMessage`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebMessage {
    /// URI of the document that posted the message.
    pub source: WideString,
    /// The message as JSON text.
    pub json: WideString,
    /// The message itself, when page script posted a plain string.
    pub text: Option<WideString>,
}

impl WebMessage {
    pub(crate) fn from_native(args: WebMessageReceivedArgs) -> Self {
        Self {
            source: args.source.map(from_native).unwrap_or_default(),
            json: args.json.map(from_native).unwrap_or_default(),
            text: args.text.map(from_native),
        }
    }

    /// Parse the JSON text.
    pub fn json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.json.to_string_lossy())
    }
}

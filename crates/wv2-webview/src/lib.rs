//! Safe handles over the WebView2 COM surface.
//!
//! Provides:
//! - [`Runtime`]: environment creation and browser version queries
//! - [`Environment`] → [`Controller`] → [`Page`] handles with checked lifetimes
//! - One-shot continuations for asynchronous calls, with an `async` adapter
//! - A native seam with a WebView2 backend (Windows) and an in-process mock
//!
//! All handles are single-threaded: create and use them on the thread that
//! runs the hosting window's message loop. On Windows that thread must have
//! initialized COM before any call into this crate.

pub mod completion;
pub mod controller;
pub mod environment;
pub mod native;
pub mod page;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use completion::{oneshot, Completion, CompletionFuture};
pub use controller::Controller;
pub use environment::Environment;
pub use native::EventToken;
pub use page::{NavigationCompleted, Page, WebMessage};
pub use runtime::Runtime;
pub use wv2_common::{BridgeError, Bounds, EnvironmentOptions, ParentWindow, Settings, WideString};

#[cfg(windows)]
pub use self::webview2_entry_points::*;

#[cfg(windows)]
mod webview2_entry_points {
    use std::cmp::Ordering;

    use wv2_common::{BridgeError, EnvironmentOptions, WideString};

    use crate::environment::Environment;
    use crate::runtime::Runtime;

    /// [`Runtime::create_environment`] on the installed runtime.
    pub fn create_environment(
        completion: impl FnOnce(Option<Environment>) + 'static,
    ) -> Result<(), BridgeError> {
        Runtime::webview2().create_environment(completion)
    }

    /// [`Runtime::create_environment_with_options`] on the installed runtime.
    pub fn create_environment_with_options(
        browser_executable_folder: impl Into<WideString>,
        user_data_folder: impl Into<WideString>,
        options: &EnvironmentOptions,
        completion: impl FnOnce(Option<Environment>) + 'static,
    ) -> Result<(), BridgeError> {
        Runtime::webview2().create_environment_with_options(
            browser_executable_folder,
            user_data_folder,
            options,
            completion,
        )
    }

    pub fn get_available_browser_version(
        browser_executable_folder: impl Into<WideString>,
    ) -> Result<WideString, BridgeError> {
        Runtime::webview2().get_available_browser_version(browser_executable_folder)
    }

    pub fn compare_browser_versions(
        version1: impl Into<WideString>,
        version2: impl Into<WideString>,
    ) -> Result<Ordering, BridgeError> {
        Runtime::webview2().compare_browser_versions(version1, version2)
    }
}

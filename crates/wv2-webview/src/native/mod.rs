//! The native seam.
//!
//! Object-safe traits mirroring the subset of the WebView2 COM surface the
//! bridge drives. Each trait object owns exactly one native reference and
//! releases it on drop. Methods report the raw native status; the bridge
//! layers above attach operation names and translate failures.
//!
//! Backends:
//! - `webview2` (Windows): the real runtime via `webview2-com`.
//! - `mock` (`feature = "mock"`): a deterministic in-process stand-in.

use wv2_common::{
    BridgeError, Bounds, NativeResult, NativeResultExt, NativeWideString, ParentWindow, Status,
    WideCString, WideString,
};

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(windows)]
pub mod webview2;

// =============================================================================
// OPERATION NAMES
// =============================================================================

/// Names of native entry points, used in diagnostics and for mock failure injection.
pub mod op {
    pub const CREATE_ENVIRONMENT: &str = "CreateCoreWebView2Environment";
    pub const CREATE_ENVIRONMENT_WITH_OPTIONS: &str = "CreateCoreWebView2EnvironmentWithOptions";
    pub const GET_AVAILABLE_BROWSER_VERSION: &str = "GetAvailableCoreWebView2BrowserVersionString";
    pub const COMPARE_BROWSER_VERSIONS: &str = "CompareBrowserVersions";

    pub const CREATE_CONTROLLER: &str = "ICoreWebView2Environment::CreateCoreWebView2Controller";

    pub const GET_IS_VISIBLE: &str = "ICoreWebView2Controller::get_IsVisible";
    pub const PUT_IS_VISIBLE: &str = "ICoreWebView2Controller::put_IsVisible";
    pub const GET_BOUNDS: &str = "ICoreWebView2Controller::get_Bounds";
    pub const PUT_BOUNDS: &str = "ICoreWebView2Controller::put_Bounds";
    pub const CLOSE: &str = "ICoreWebView2Controller::Close";
    pub const GET_CORE_WEBVIEW2: &str = "ICoreWebView2Controller::get_CoreWebView2";

    pub const GET_SETTINGS: &str = "ICoreWebView2::get_Settings";
    pub const NAVIGATE: &str = "ICoreWebView2::Navigate";
    pub const NAVIGATE_TO_STRING: &str = "ICoreWebView2::NavigateToString";
    pub const EXECUTE_SCRIPT: &str = "ICoreWebView2::ExecuteScript";
    pub const RELOAD: &str = "ICoreWebView2::Reload";
    pub const STOP: &str = "ICoreWebView2::Stop";
    pub const POST_WEB_MESSAGE_AS_JSON: &str = "ICoreWebView2::PostWebMessageAsJson";
    pub const GET_DOCUMENT_TITLE: &str = "ICoreWebView2::get_DocumentTitle";
    pub const GET_SOURCE: &str = "ICoreWebView2::get_Source";
    pub const OPEN_DEV_TOOLS_WINDOW: &str = "ICoreWebView2::OpenDevToolsWindow";
    pub const ADD_NAVIGATION_COMPLETED: &str = "ICoreWebView2::add_NavigationCompleted";
    pub const REMOVE_NAVIGATION_COMPLETED: &str = "ICoreWebView2::remove_NavigationCompleted";
    pub const ADD_WEB_MESSAGE_RECEIVED: &str = "ICoreWebView2::add_WebMessageReceived";
    pub const REMOVE_WEB_MESSAGE_RECEIVED: &str = "ICoreWebView2::remove_WebMessageReceived";
    pub const ADD_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED: &str =
        "ICoreWebView2::AddScriptToExecuteOnDocumentCreated";
    pub const REMOVE_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED: &str =
        "ICoreWebView2::RemoveScriptToExecuteOnDocumentCreated";

    pub const GET_IS_SCRIPT_ENABLED: &str = "ICoreWebView2Settings::get_IsScriptEnabled";
    pub const PUT_IS_SCRIPT_ENABLED: &str = "ICoreWebView2Settings::put_IsScriptEnabled";
    pub const GET_IS_WEB_MESSAGE_ENABLED: &str = "ICoreWebView2Settings::get_IsWebMessageEnabled";
    pub const PUT_IS_WEB_MESSAGE_ENABLED: &str = "ICoreWebView2Settings::put_IsWebMessageEnabled";
    pub const GET_ARE_DEFAULT_SCRIPT_DIALOGS_ENABLED: &str =
        "ICoreWebView2Settings::get_AreDefaultScriptDialogsEnabled";
    pub const PUT_ARE_DEFAULT_SCRIPT_DIALOGS_ENABLED: &str =
        "ICoreWebView2Settings::put_AreDefaultScriptDialogsEnabled";
    pub const GET_IS_STATUS_BAR_ENABLED: &str = "ICoreWebView2Settings::get_IsStatusBarEnabled";
    pub const PUT_IS_STATUS_BAR_ENABLED: &str = "ICoreWebView2Settings::put_IsStatusBarEnabled";
    pub const GET_ARE_DEV_TOOLS_ENABLED: &str = "ICoreWebView2Settings::get_AreDevToolsEnabled";
    pub const PUT_ARE_DEV_TOOLS_ENABLED: &str = "ICoreWebView2Settings::put_AreDevToolsEnabled";
    pub const GET_ARE_DEFAULT_CONTEXT_MENUS_ENABLED: &str =
        "ICoreWebView2Settings::get_AreDefaultContextMenusEnabled";
    pub const PUT_ARE_DEFAULT_CONTEXT_MENUS_ENABLED: &str =
        "ICoreWebView2Settings::put_AreDefaultContextMenusEnabled";
    pub const GET_IS_ZOOM_CONTROL_ENABLED: &str = "ICoreWebView2Settings::get_IsZoomControlEnabled";
    pub const PUT_IS_ZOOM_CONTROL_ENABLED: &str = "ICoreWebView2Settings::put_IsZoomControlEnabled";
    pub const GET_IS_BUILT_IN_ERROR_PAGE_ENABLED: &str =
        "ICoreWebView2Settings::get_IsBuiltInErrorPageEnabled";
    pub const PUT_IS_BUILT_IN_ERROR_PAGE_ENABLED: &str =
        "ICoreWebView2Settings::put_IsBuiltInErrorPageEnabled";
}

/// Marshal host text for `operation`.
///
/// Text with an embedded NUL fails with `E_INVALIDARG`: the runtime reads
/// its inputs up to the first NUL and would otherwise act on a prefix.
pub(crate) fn native_text(
    text: impl Into<WideString>,
    operation: &'static str,
) -> Result<WideCString, BridgeError> {
    text.into().to_native().checked().for_operation(operation)
}

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// Registration token for a native event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventToken(pub i64);

/// Arguments of the native `NavigationCompleted` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationCompletedArgs {
    pub is_success: bool,
    /// `COREWEBVIEW2_WEB_ERROR_STATUS`; zero when the navigation succeeded.
    pub web_error_status: i32,
    pub navigation_id: u64,
}

/// Arguments of the native `WebMessageReceived` event, already read out of
/// the event args object. Each string is owned by the receiver.
#[derive(Debug, Default)]
pub struct WebMessageReceivedArgs {
    pub source: Option<NativeWideString>,
    pub json: Option<NativeWideString>,
    /// Present only when the message was posted as a plain string.
    pub text: Option<NativeWideString>,
}

pub type EnvironmentCompletedHandler = Box<dyn FnOnce(Status, Option<Box<dyn NativeEnvironment>>)>;
pub type ControllerCompletedHandler = Box<dyn FnOnce(Status, Option<Box<dyn NativeController>>)>;
/// Completion for calls whose result string is owned by the native caller
/// (script results, script ids). The backend copies it before returning.
pub type StringCompletedHandler = Box<dyn FnOnce(Status, Option<WideString>)>;
pub type NavigationCompletedEventHandler = Box<dyn FnMut(NavigationCompletedArgs)>;
pub type WebMessageReceivedEventHandler = Box<dyn FnMut(WebMessageReceivedArgs)>;

// =============================================================================
// ENVIRONMENT OPTIONS
// =============================================================================

/// The native options object, recording which setters were called.
///
/// A `None` field means the setter was never invoked, which the runtime
/// treats differently from a setter invoked with an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeEnvironmentOptions {
    pub additional_browser_arguments: Option<WideCString>,
    pub language: Option<WideCString>,
    pub target_compatible_browser_version: Option<WideCString>,
    pub allow_single_sign_on_using_os_primary_account: Option<bool>,
}

impl NativeEnvironmentOptions {
    pub fn put_additional_browser_arguments(&mut self, value: WideCString) {
        self.additional_browser_arguments = Some(value);
    }

    pub fn put_language(&mut self, value: WideCString) {
        self.language = Some(value);
    }

    pub fn put_target_compatible_browser_version(&mut self, value: WideCString) {
        self.target_compatible_browser_version = Some(value);
    }

    pub fn put_allow_single_sign_on_using_os_primary_account(&mut self, value: bool) {
        self.allow_single_sign_on_using_os_primary_account = Some(value);
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Process-wide entry points of the runtime loader.
pub trait NativeRuntime {
    fn create_environment(&self, handler: EnvironmentCompletedHandler) -> NativeResult<()>;

    fn create_environment_with_options(
        &self,
        browser_executable_folder: &WideCString,
        user_data_folder: &WideCString,
        options: &NativeEnvironmentOptions,
        handler: EnvironmentCompletedHandler,
    ) -> NativeResult<()>;

    fn get_available_browser_version_string(
        &self,
        browser_executable_folder: &WideCString,
    ) -> NativeResult<Option<NativeWideString>>;

    /// Negative, zero or positive, as the native comparison reports it.
    fn compare_browser_versions(&self, version1: &WideCString, version2: &WideCString) -> NativeResult<i32>;
}

pub trait NativeEnvironment {
    fn create_controller(
        &self,
        parent_window: ParentWindow,
        handler: ControllerCompletedHandler,
    ) -> NativeResult<()>;
}

pub trait NativeController {
    fn is_visible(&self) -> NativeResult<bool>;
    fn set_is_visible(&self, visible: bool) -> NativeResult<()>;
    fn bounds(&self) -> NativeResult<Bounds>;
    fn set_bounds(&self, bounds: Bounds) -> NativeResult<()>;
    fn close(&self) -> NativeResult<()>;
    /// A new reference to the controller's page object.
    fn core_webview(&self) -> NativeResult<Box<dyn NativePage>>;
}

pub trait NativeSettings {
    fn is_script_enabled(&self) -> NativeResult<bool>;
    fn set_is_script_enabled(&self, value: bool) -> NativeResult<()>;
    fn is_web_message_enabled(&self) -> NativeResult<bool>;
    fn set_is_web_message_enabled(&self, value: bool) -> NativeResult<()>;
    fn are_default_script_dialogs_enabled(&self) -> NativeResult<bool>;
    fn set_are_default_script_dialogs_enabled(&self, value: bool) -> NativeResult<()>;
    fn is_status_bar_enabled(&self) -> NativeResult<bool>;
    fn set_is_status_bar_enabled(&self, value: bool) -> NativeResult<()>;
    fn are_dev_tools_enabled(&self) -> NativeResult<bool>;
    fn set_are_dev_tools_enabled(&self, value: bool) -> NativeResult<()>;
    fn are_default_context_menus_enabled(&self) -> NativeResult<bool>;
    fn set_are_default_context_menus_enabled(&self, value: bool) -> NativeResult<()>;
    fn is_zoom_control_enabled(&self) -> NativeResult<bool>;
    fn set_is_zoom_control_enabled(&self, value: bool) -> NativeResult<()>;
    fn is_built_in_error_page_enabled(&self) -> NativeResult<bool>;
    fn set_is_built_in_error_page_enabled(&self, value: bool) -> NativeResult<()>;
}

pub trait NativePage {
    fn settings(&self) -> NativeResult<Box<dyn NativeSettings>>;
    fn navigate(&self, uri: &WideCString) -> NativeResult<()>;
    fn navigate_to_string(&self, html_content: &WideCString) -> NativeResult<()>;
    fn execute_script(&self, javascript: &WideCString, handler: StringCompletedHandler) -> NativeResult<()>;
    fn reload(&self) -> NativeResult<()>;
    fn stop(&self) -> NativeResult<()>;
    fn post_web_message_as_json(&self, json: &WideCString) -> NativeResult<()>;
    fn document_title(&self) -> NativeResult<Option<NativeWideString>>;
    fn source(&self) -> NativeResult<Option<NativeWideString>>;
    fn open_dev_tools_window(&self) -> NativeResult<()>;

    fn add_navigation_completed(&self, handler: NavigationCompletedEventHandler) -> NativeResult<EventToken>;
    fn remove_navigation_completed(&self, token: EventToken) -> NativeResult<()>;
    fn add_web_message_received(&self, handler: WebMessageReceivedEventHandler) -> NativeResult<EventToken>;
    fn remove_web_message_received(&self, token: EventToken) -> NativeResult<()>;

    fn add_script_to_execute_on_document_created(
        &self,
        javascript: &WideCString,
        handler: StringCompletedHandler,
    ) -> NativeResult<()>;
    fn remove_script_to_execute_on_document_created(&self, id: &WideCString) -> NativeResult<()>;
}

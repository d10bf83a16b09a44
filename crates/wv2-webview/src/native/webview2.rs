//! The WebView2 runtime backend.
//!
//! Each wrapper owns one COM reference and releases it on drop. Strings the
//! runtime allocates are taken over as soon as the out-parameter is written,
//! including on failure, and released with `CoTaskMemFree`.
//!
//! The hosting thread must have initialized COM as a single-threaded
//! apartment and must pump window messages for completions to arrive.

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;

use webview2_com::Microsoft::Web::WebView2::Win32::{
    CompareBrowserVersions, CreateCoreWebView2Environment,
    CreateCoreWebView2EnvironmentWithOptions, GetAvailableCoreWebView2BrowserVersionString,
    ICoreWebView2, ICoreWebView2Controller, ICoreWebView2CreateCoreWebView2EnvironmentCompletedHandler,
    ICoreWebView2Environment, ICoreWebView2EnvironmentOptions,
    ICoreWebView2NavigationCompletedEventArgs, ICoreWebView2Settings,
    ICoreWebView2WebMessageReceivedEventArgs, COREWEBVIEW2_WEB_ERROR_STATUS,
};
use webview2_com::{
    AddScriptToExecuteOnDocumentCreatedCompletedHandler, CoreWebView2EnvironmentOptions,
    CreateCoreWebView2ControllerCompletedHandler, CreateCoreWebView2EnvironmentCompletedHandler,
    ExecuteScriptCompletedHandler, NavigationCompletedEventHandler, WebMessageReceivedEventHandler,
};
use windows::core::{BOOL, PCWSTR, PWSTR};
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::System::Com::CoTaskMemFree;
use wv2_common::{
    Bounds, NativeResult, NativeWideString, ParentWindow, Status, WideCString, WideString,
};

use super::{
    ControllerCompletedHandler, EnvironmentCompletedHandler, EventToken, NativeController,
    NativeEnvironment, NativeEnvironmentOptions, NativePage, NativeRuntime, NativeSettings,
    NavigationCompletedArgs, NavigationCompletedEventHandler as NavigationHandler,
    StringCompletedHandler, WebMessageReceivedArgs,
    WebMessageReceivedEventHandler as WebMessageHandler,
};

// =============================================================================
// HELPERS
// =============================================================================

fn native_result<T>(result: windows::core::Result<T>) -> NativeResult<T> {
    result.map_err(|err| Status(err.code().0))
}

fn completion_status(error_code: windows::core::Result<()>) -> Status {
    match error_code {
        Ok(()) => Status::S_OK,
        Err(err) => Status(err.code().0),
    }
}

unsafe fn release_co_task_mem(ptr: NonNull<u16>, _len: usize) {
    CoTaskMemFree(Some(ptr.as_ptr() as *const c_void));
}

/// Read a runtime-allocated string through an out-parameter.
///
/// # Safety
///
/// `read` must be a COM getter that either leaves the pointer null or
/// stores a `CoTaskMemAlloc`ed, NUL-terminated string in it.
unsafe fn out_string(
    read: impl FnOnce(&mut PWSTR) -> windows::core::Result<()>,
) -> windows::core::Result<Option<NativeWideString>> {
    let mut value = PWSTR::null();
    let result = read(&mut value);
    let value = NativeWideString::from_raw_terminated(value.0, release_co_task_mem);
    result.map(|()| value)
}

fn pcwstr(value: &WideCString) -> PCWSTR {
    PCWSTR(value.as_ptr())
}

/// Null for an empty folder, which selects the runtime default.
fn optional_pcwstr(value: &WideCString) -> PCWSTR {
    if value.is_empty() {
        PCWSTR::null()
    } else {
        pcwstr(value)
    }
}

/// Run a host callback without letting a panic unwind into the runtime.
fn guarded(callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::error!("host callback panicked inside a WebView2 callback");
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

/// The installed Evergreen or fixed-version runtime.
pub struct WebView2Runtime;

fn environment_completed(
    handler: EnvironmentCompletedHandler,
) -> ICoreWebView2CreateCoreWebView2EnvironmentCompletedHandler {
    CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(move |error_code, environment| {
        let status = completion_status(error_code);
        let environment = environment
            .map(|environment| Box::new(WebView2Environment(environment)) as Box<dyn NativeEnvironment>);
        guarded(|| handler(status, environment));
        Ok(())
    }))
}

impl NativeRuntime for WebView2Runtime {
    fn create_environment(&self, handler: EnvironmentCompletedHandler) -> NativeResult<()> {
        let completed = environment_completed(handler);
        native_result(unsafe { CreateCoreWebView2Environment(&completed) })
    }

    fn create_environment_with_options(
        &self,
        browser_executable_folder: &WideCString,
        user_data_folder: &WideCString,
        options: &NativeEnvironmentOptions,
        handler: EnvironmentCompletedHandler,
    ) -> NativeResult<()> {
        let native_options = ICoreWebView2EnvironmentOptions::from(CoreWebView2EnvironmentOptions::default());
        unsafe {
            if let Some(arguments) = &options.additional_browser_arguments {
                native_result(native_options.SetAdditionalBrowserArguments(pcwstr(arguments)))?;
            }
            if let Some(language) = &options.language {
                native_result(native_options.SetLanguage(pcwstr(language)))?;
            }
            if let Some(version) = &options.target_compatible_browser_version {
                native_result(native_options.SetTargetCompatibleBrowserVersion(pcwstr(version)))?;
            }
            if let Some(allow) = options.allow_single_sign_on_using_os_primary_account {
                native_result(native_options.SetAllowSingleSignOnUsingOSPrimaryAccount(allow))?;
            }
        }

        let completed = environment_completed(handler);
        native_result(unsafe {
            CreateCoreWebView2EnvironmentWithOptions(
                optional_pcwstr(browser_executable_folder),
                optional_pcwstr(user_data_folder),
                &native_options,
                &completed,
            )
        })
    }

    fn get_available_browser_version_string(
        &self,
        browser_executable_folder: &WideCString,
    ) -> NativeResult<Option<NativeWideString>> {
        native_result(unsafe {
            out_string(|version| {
                GetAvailableCoreWebView2BrowserVersionString(
                    optional_pcwstr(browser_executable_folder),
                    version,
                )
            })
        })
    }

    fn compare_browser_versions(
        &self,
        version1: &WideCString,
        version2: &WideCString,
    ) -> NativeResult<i32> {
        let mut result = 0;
        native_result(unsafe {
            CompareBrowserVersions(pcwstr(version1), pcwstr(version2), &mut result)
        })?;
        Ok(result)
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

struct WebView2Environment(ICoreWebView2Environment);

impl NativeEnvironment for WebView2Environment {
    fn create_controller(
        &self,
        parent_window: ParentWindow,
        handler: ControllerCompletedHandler,
    ) -> NativeResult<()> {
        let completed =
            CreateCoreWebView2ControllerCompletedHandler::create(Box::new(move |error_code, controller| {
                let status = completion_status(error_code);
                let controller = controller
                    .map(|controller| Box::new(WebView2Controller(controller)) as Box<dyn NativeController>);
                guarded(|| handler(status, controller));
                Ok(())
            }));
        native_result(unsafe {
            self.0
                .CreateCoreWebView2Controller(HWND(parent_window.0 as *mut c_void), &completed)
        })
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

struct WebView2Controller(ICoreWebView2Controller);

impl NativeController for WebView2Controller {
    fn is_visible(&self) -> NativeResult<bool> {
        let mut visible = BOOL::default();
        native_result(unsafe { self.0.IsVisible(&mut visible) })?;
        Ok(visible.as_bool())
    }

    fn set_is_visible(&self, visible: bool) -> NativeResult<()> {
        native_result(unsafe { self.0.SetIsVisible(visible) })
    }

    fn bounds(&self) -> NativeResult<Bounds> {
        let mut rect = RECT::default();
        native_result(unsafe { self.0.Bounds(&mut rect) })?;
        Ok(Bounds::new(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn set_bounds(&self, bounds: Bounds) -> NativeResult<()> {
        let rect = RECT {
            left: bounds.left,
            top: bounds.top,
            right: bounds.right,
            bottom: bounds.bottom,
        };
        native_result(unsafe { self.0.SetBounds(rect) })
    }

    fn close(&self) -> NativeResult<()> {
        native_result(unsafe { self.0.Close() })
    }

    fn core_webview(&self) -> NativeResult<Box<dyn NativePage>> {
        let page = native_result(unsafe { self.0.CoreWebView2() })?;
        Ok(Box::new(WebView2Page(page)))
    }
}

// =============================================================================
// PAGE
// =============================================================================

struct WebView2Page(ICoreWebView2);

unsafe fn navigation_args(
    args: &ICoreWebView2NavigationCompletedEventArgs,
) -> windows::core::Result<NavigationCompletedArgs> {
    let mut is_success = BOOL::default();
    args.IsSuccess(&mut is_success)?;
    let mut web_error_status = COREWEBVIEW2_WEB_ERROR_STATUS::default();
    args.WebErrorStatus(&mut web_error_status)?;
    let mut navigation_id = 0;
    args.NavigationId(&mut navigation_id)?;
    Ok(NavigationCompletedArgs {
        is_success: is_success.as_bool(),
        web_error_status: web_error_status.0,
        navigation_id,
    })
}

unsafe fn web_message_args(
    args: &ICoreWebView2WebMessageReceivedEventArgs,
) -> windows::core::Result<WebMessageReceivedArgs> {
    let source = out_string(|source| args.Source(source))?;
    let json = out_string(|json| args.WebMessageAsJson(json))?;
    // Fails with E_INVALIDARG when the message is not a plain string.
    let text = out_string(|text| args.TryGetWebMessageAsString(text)).unwrap_or(None);
    Ok(WebMessageReceivedArgs { source, json, text })
}

fn string_completed(
    handler: StringCompletedHandler,
) -> impl FnOnce(windows::core::Result<()>, String) -> windows::core::Result<()> {
    move |error_code, result| {
        let status = completion_status(error_code);
        let result = status.is_success().then(|| WideString::from(result));
        guarded(|| handler(status, result));
        Ok(())
    }
}

impl NativePage for WebView2Page {
    fn settings(&self) -> NativeResult<Box<dyn NativeSettings>> {
        let settings = native_result(unsafe { self.0.Settings() })?;
        Ok(Box::new(WebView2Settings(settings)))
    }

    fn navigate(&self, uri: &WideCString) -> NativeResult<()> {
        native_result(unsafe { self.0.Navigate(pcwstr(uri)) })
    }

    fn navigate_to_string(&self, html_content: &WideCString) -> NativeResult<()> {
        native_result(unsafe { self.0.NavigateToString(pcwstr(html_content)) })
    }

    fn execute_script(
        &self,
        javascript: &WideCString,
        handler: StringCompletedHandler,
    ) -> NativeResult<()> {
        let completed = ExecuteScriptCompletedHandler::create(Box::new(string_completed(handler)));
        native_result(unsafe { self.0.ExecuteScript(pcwstr(javascript), &completed) })
    }

    fn reload(&self) -> NativeResult<()> {
        native_result(unsafe { self.0.Reload() })
    }

    fn stop(&self) -> NativeResult<()> {
        native_result(unsafe { self.0.Stop() })
    }

    fn post_web_message_as_json(&self, json: &WideCString) -> NativeResult<()> {
        native_result(unsafe { self.0.PostWebMessageAsJson(pcwstr(json)) })
    }

    fn document_title(&self) -> NativeResult<Option<NativeWideString>> {
        native_result(unsafe { out_string(|title| self.0.DocumentTitle(title)) })
    }

    fn source(&self) -> NativeResult<Option<NativeWideString>> {
        native_result(unsafe { out_string(|source| self.0.Source(source)) })
    }

    fn open_dev_tools_window(&self) -> NativeResult<()> {
        native_result(unsafe { self.0.OpenDevToolsWindow() })
    }

    fn add_navigation_completed(&self, mut handler: NavigationHandler) -> NativeResult<EventToken> {
        let completed = NavigationCompletedEventHandler::create(Box::new(move |_sender, args| {
            if let Some(args) = args {
                let args = unsafe { navigation_args(&args) }?;
                guarded(|| handler(args));
            }
            Ok(())
        }));
        let mut token = 0;
        native_result(unsafe { self.0.add_NavigationCompleted(&completed, &mut token) })?;
        Ok(EventToken(token))
    }

    fn remove_navigation_completed(&self, token: EventToken) -> NativeResult<()> {
        native_result(unsafe { self.0.remove_NavigationCompleted(token.0) })
    }

    fn add_web_message_received(&self, mut handler: WebMessageHandler) -> NativeResult<EventToken> {
        let received = WebMessageReceivedEventHandler::create(Box::new(move |_sender, args| {
            if let Some(args) = args {
                let args = unsafe { web_message_args(&args) }?;
                guarded(|| handler(args));
            }
            Ok(())
        }));
        let mut token = 0;
        native_result(unsafe { self.0.add_WebMessageReceived(&received, &mut token) })?;
        Ok(EventToken(token))
    }

    fn remove_web_message_received(&self, token: EventToken) -> NativeResult<()> {
        native_result(unsafe { self.0.remove_WebMessageReceived(token.0) })
    }

    fn add_script_to_execute_on_document_created(
        &self,
        javascript: &WideCString,
        handler: StringCompletedHandler,
    ) -> NativeResult<()> {
        let completed =
            AddScriptToExecuteOnDocumentCreatedCompletedHandler::create(Box::new(string_completed(handler)));
        native_result(unsafe {
            self.0
                .AddScriptToExecuteOnDocumentCreated(pcwstr(javascript), &completed)
        })
    }

    fn remove_script_to_execute_on_document_created(&self, id: &WideCString) -> NativeResult<()> {
        native_result(unsafe { self.0.RemoveScriptToExecuteOnDocumentCreated(pcwstr(id)) })
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

struct WebView2Settings(ICoreWebView2Settings);

macro_rules! webview2_toggles {
    ($($getter:ident / $setter:ident => $get:ident / $put:ident;)*) => {
        impl NativeSettings for WebView2Settings {
            $(
                fn $getter(&self) -> NativeResult<bool> {
                    let mut value = BOOL::default();
                    native_result(unsafe { self.0.$get(&mut value) })?;
                    Ok(value.as_bool())
                }

                fn $setter(&self, value: bool) -> NativeResult<()> {
                    native_result(unsafe { self.0.$put(value) })
                }
            )*
        }
    };
}

webview2_toggles! {
    is_script_enabled / set_is_script_enabled
        => IsScriptEnabled / SetIsScriptEnabled;
    is_web_message_enabled / set_is_web_message_enabled
        => IsWebMessageEnabled / SetIsWebMessageEnabled;
    are_default_script_dialogs_enabled / set_are_default_script_dialogs_enabled
        => AreDefaultScriptDialogsEnabled / SetAreDefaultScriptDialogsEnabled;
    is_status_bar_enabled / set_is_status_bar_enabled
        => IsStatusBarEnabled / SetIsStatusBarEnabled;
    are_dev_tools_enabled / set_are_dev_tools_enabled
        => AreDevToolsEnabled / SetAreDevToolsEnabled;
    are_default_context_menus_enabled / set_are_default_context_menus_enabled
        => AreDefaultContextMenusEnabled / SetAreDefaultContextMenusEnabled;
    is_zoom_control_enabled / set_is_zoom_control_enabled
        => IsZoomControlEnabled / SetIsZoomControlEnabled;
    is_built_in_error_page_enabled / set_is_built_in_error_page_enabled
        => IsBuiltInErrorPageEnabled / SetIsBuiltInErrorPageEnabled;
}

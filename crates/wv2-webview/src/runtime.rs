use std::cmp::Ordering;
use std::rc::Rc;

use tracing::{debug, warn};
use wv2_common::{
    from_native, BridgeError, EnvironmentOptions, NativeResultExt, Status, WideString,
};

use crate::environment::Environment;
use crate::native::{
    native_text, op, EnvironmentCompletedHandler, NativeEnvironmentOptions, NativeRuntime,
};

/// Process-wide entry points: environment creation and runtime version queries.
#[derive(Clone)]
pub struct Runtime {
    native: Rc<dyn NativeRuntime>,
}

impl Runtime {
    pub fn new(native: Rc<dyn NativeRuntime>) -> Self {
        Self { native }
    }

    /// The installed WebView2 runtime.
    #[cfg(windows)]
    pub fn webview2() -> Self {
        Self::new(Rc::new(crate::native::webview2::WebView2Runtime))
    }

    /// Create an environment with the runtime's defaults.
    ///
    /// `completion` receives `None` when the native creation reports failure.
    pub fn create_environment(
        &self,
        completion: impl FnOnce(Option<Environment>) + 'static,
    ) -> Result<(), BridgeError> {
        debug!("creating environment");
        self.native
            .create_environment(environment_completed(op::CREATE_ENVIRONMENT, completion))
            .for_operation(op::CREATE_ENVIRONMENT)
    }

    /// Create an environment with explicit folders and options.
    ///
    /// Empty text options are left unset on the native options object; the
    /// single-sign-on flag is always applied.
    pub fn create_environment_with_options(
        &self,
        browser_executable_folder: impl Into<WideString>,
        user_data_folder: impl Into<WideString>,
        options: &EnvironmentOptions,
        completion: impl FnOnce(Option<Environment>) + 'static,
    ) -> Result<(), BridgeError> {
        let browser_executable_folder = browser_executable_folder.into();
        let user_data_folder = user_data_folder.into();
        debug!(
            browser_executable_folder = %browser_executable_folder,
            user_data_folder = %user_data_folder,
            "creating environment with options"
        );
        let operation = op::CREATE_ENVIRONMENT_WITH_OPTIONS;
        let browser_executable_folder = native_text(browser_executable_folder, operation)?;
        let user_data_folder = native_text(user_data_folder, operation)?;
        let options = native_options(options)?;
        self.native
            .create_environment_with_options(
                &browser_executable_folder,
                &user_data_folder,
                &options,
                environment_completed(operation, completion),
            )
            .for_operation(op::CREATE_ENVIRONMENT_WITH_OPTIONS)
    }

    /// Version string of the runtime that would be used for the given
    /// browser folder (empty for the installed runtime).
    pub fn get_available_browser_version(
        &self,
        browser_executable_folder: impl Into<WideString>,
    ) -> Result<WideString, BridgeError> {
        let folder = native_text(browser_executable_folder, op::GET_AVAILABLE_BROWSER_VERSION)?;
        self.native
            .get_available_browser_version_string(&folder)
            .for_operation(op::GET_AVAILABLE_BROWSER_VERSION)?
            .map(from_native)
            .ok_or_else(|| {
                warn!("no compatible browser runtime installed");
                BridgeError::native(op::GET_AVAILABLE_BROWSER_VERSION, Status::E_FILE_NOT_FOUND)
            })
    }

    /// Compare two version strings using the runtime's own grammar.
    pub fn compare_browser_versions(
        &self,
        version1: impl Into<WideString>,
        version2: impl Into<WideString>,
    ) -> Result<Ordering, BridgeError> {
        let version1 = native_text(version1, op::COMPARE_BROWSER_VERSIONS)?;
        let version2 = native_text(version2, op::COMPARE_BROWSER_VERSIONS)?;
        let result = self
            .native
            .compare_browser_versions(&version1, &version2)
            .for_operation(op::COMPARE_BROWSER_VERSIONS)?;
        Ok(result.cmp(&0))
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

fn native_options(options: &EnvironmentOptions) -> Result<NativeEnvironmentOptions, BridgeError> {
    let operation = op::CREATE_ENVIRONMENT_WITH_OPTIONS;
    let mut native = NativeEnvironmentOptions::default();
    if !options.additional_browser_arguments.is_empty() {
        native.put_additional_browser_arguments(native_text(
            &options.additional_browser_arguments,
            operation,
        )?);
    }
    if !options.language.is_empty() {
        native.put_language(native_text(&options.language, operation)?);
    }
    if !options.target_compatible_browser_version.is_empty() {
        native.put_target_compatible_browser_version(native_text(
            &options.target_compatible_browser_version,
            operation,
        )?);
    }
    native.put_allow_single_sign_on_using_os_primary_account(
        options.allow_single_sign_on_using_os_primary_account,
    );
    Ok(native)
}

fn environment_completed(
    operation: &'static str,
    completion: impl FnOnce(Option<Environment>) + 'static,
) -> EnvironmentCompletedHandler {
    Box::new(move |status, native| {
        let environment = match native {
            Some(native) if status.is_success() => {
                debug!("environment created");
                Some(Environment::new(native))
            }
            _ => {
                warn!(operation, %status, "environment creation completed without an environment");
                None
            }
        };
        completion(environment);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::mock::MockRuntime;
    use std::cell::RefCell;

    fn capture() -> (
        Rc<RefCell<Option<Option<Environment>>>>,
        impl FnOnce(Option<Environment>) + 'static,
    ) {
        let slot = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        (slot, move |environment| *sink.borrow_mut() = Some(environment))
    }

    // -- environment creation --

    #[test]
    fn create_environment_completes_on_pump() {
        let mock = MockRuntime::new();
        let (slot, completion) = capture();
        mock.runtime().create_environment(completion).unwrap();

        assert!(slot.borrow().is_none(), "completion must not run synchronously");
        mock.run_until_idle();

        let environment = slot.borrow_mut().take().unwrap().unwrap();
        assert!(environment.is_created());
        assert_eq!(mock.live_environments(), 1);
        drop(environment);
        assert_eq!(mock.live_environments(), 0);
    }

    #[test]
    fn failed_completion_delivers_absent_environment() {
        let mock = MockRuntime::new();
        mock.fail_completion(op::CREATE_ENVIRONMENT, Status::E_FAIL);
        let (slot, completion) = capture();
        mock.runtime().create_environment(completion).unwrap();
        mock.run_until_idle();

        assert!(matches!(*slot.borrow(), Some(None)));
    }

    #[test]
    fn synchronous_failure_is_raised_and_completion_dropped() {
        let mock = MockRuntime::new();
        mock.fail(op::CREATE_ENVIRONMENT, Status::E_UNEXPECTED);
        let (slot, completion) = capture();

        let err = mock.runtime().create_environment(completion).unwrap_err();
        assert_eq!(err.status(), Some(Status::E_UNEXPECTED));
        assert_eq!(
            err.to_string(),
            "CreateCoreWebView2Environment failed: 0x8000ffff"
        );
        assert_eq!(mock.run_until_idle(), 0);
        assert!(slot.borrow().is_none());
    }

    // -- options --

    #[test]
    fn empty_language_is_never_set() {
        let mock = MockRuntime::new();
        let options = EnvironmentOptions::new("", "", "", false);
        mock.runtime()
            .create_environment_with_options("", "", &options, |_| {})
            .unwrap();

        let requests = mock.environment_requests();
        assert_eq!(requests.len(), 1);
        let native = &requests[0].options;
        assert_eq!(native.language, None);
        assert_eq!(native.additional_browser_arguments, None);
        assert_eq!(native.target_compatible_browser_version, None);
        assert_eq!(native.allow_single_sign_on_using_os_primary_account, Some(false));
    }

    #[test]
    fn non_empty_options_are_forwarded_verbatim() {
        let mock = MockRuntime::new();
        let options = EnvironmentOptions::new("--disable-gpu", "fr-CA", "120.0.0.0", true);
        mock.runtime()
            .create_environment_with_options(r"C:\Edge", r"C:\Data", &options, |_| {})
            .unwrap();

        let request = mock.environment_requests().remove(0);
        assert_eq!(request.browser_executable_folder, r"C:\Edge");
        assert_eq!(request.user_data_folder, r"C:\Data");
        let native = request.options;
        assert_eq!(native.language.map(|l| l.to_wide()), Some(WideString::from("fr-CA")));
        assert_eq!(
            native.additional_browser_arguments.map(|a| a.to_wide()),
            Some(WideString::from("--disable-gpu"))
        );
        assert_eq!(
            native.target_compatible_browser_version.map(|v| v.to_wide()),
            Some(WideString::from("120.0.0.0"))
        );
        assert_eq!(native.allow_single_sign_on_using_os_primary_account, Some(true));
    }

    #[test]
    fn embedded_nul_in_options_is_rejected() {
        let mock = MockRuntime::new();
        let options = EnvironmentOptions::new("", "en\0-US", "", false);
        let err = mock
            .runtime()
            .create_environment_with_options("", "", &options, |_| panic!("must not complete"))
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::NativeCallFailed {
                operation: op::CREATE_ENVIRONMENT_WITH_OPTIONS,
                status: Status::E_INVALIDARG,
            }
        ));

        let err = mock
            .runtime()
            .create_environment_with_options("C:\\Edge\0", "", &EnvironmentOptions::default(), |_| {})
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::E_INVALIDARG));

        assert!(mock.environment_requests().is_empty());
        assert_eq!(mock.run_until_idle(), 0);
    }

    #[test]
    fn embedded_nul_in_version_is_rejected() {
        let runtime = MockRuntime::new().runtime();
        let err = runtime.compare_browser_versions("1.0\0.9", "1.0").unwrap_err();
        assert_eq!(err.status(), Some(Status::E_INVALIDARG));
        let err = runtime.get_available_browser_version("C:\\rt\0").unwrap_err();
        assert_eq!(
            err.to_string(),
            "GetAvailableCoreWebView2BrowserVersionString failed: 0x80070057"
        );
    }

    // -- versions --

    #[test]
    fn compare_browser_versions_orders() {
        let runtime = MockRuntime::new().runtime();
        assert_eq!(runtime.compare_browser_versions("1.2.3.4", "1.2.3.4").unwrap(), Ordering::Equal);
        assert_eq!(runtime.compare_browser_versions("1.2.3.4", "1.2.3.5").unwrap(), Ordering::Less);
        assert_eq!(runtime.compare_browser_versions("1.2.3.5", "1.2.3.4").unwrap(), Ordering::Greater);
        assert_eq!(runtime.compare_browser_versions("1.2.3.4", "1.2.3.5").unwrap() as i8, -1);
    }

    #[test]
    fn compare_rejects_malformed_versions() {
        let runtime = MockRuntime::new().runtime();
        let err = runtime.compare_browser_versions("banana", "1.0").unwrap_err();
        assert_eq!(err.status(), Some(Status::E_INVALIDARG));
    }

    #[test]
    fn available_version_is_copied_and_released() {
        let mock = MockRuntime::new();
        let before = mock.live_strings();
        let version = mock.runtime().get_available_browser_version("").unwrap();
        assert_eq!(version, crate::native::mock::DEFAULT_INSTALLED_VERSION);
        assert_eq!(mock.live_strings(), before);
    }

    #[test]
    fn missing_runtime_fails_version_query() {
        let mock = MockRuntime::new();
        mock.set_installed_version(None);
        let err = mock.runtime().get_available_browser_version("").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::NativeCallFailed {
                operation: op::GET_AVAILABLE_BROWSER_VERSION,
                status: Status::E_FILE_NOT_FOUND,
            }
        ));
    }
}

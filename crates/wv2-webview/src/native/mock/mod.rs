//! Deterministic in-process backend.
//!
//! Completions and events never fire inside the call that requested them:
//! they are queued and delivered when the host pumps the queue with
//! [`MockRuntime::run_until_idle`], the way the real runtime delivers them
//! from the window's message loop.
//!
//! Native state (settings, source, title, subscriptions) lives on shared
//! objects so that several references to the same native page observe the
//! same values, as COM references do.

mod objects;

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::ptr::NonNull;
use std::rc::{Rc, Weak};

use wv2_common::{NativeResult, NativeWideString, Status, WideCString, WideString};

use self::objects::{MockEnvironment, PageState};
use super::{op, EnvironmentCompletedHandler, NativeEnvironmentOptions, NativeRuntime};
use crate::runtime::Runtime;

/// Version reported by a fresh mock, shaped like a stable Edge release.
pub const DEFAULT_INSTALLED_VERSION: &str = "120.0.2210.91";

type Task = Box<dyn FnOnce()>;

thread_local! {
    static LIVE_STRINGS: Cell<isize> = const { Cell::new(0) };
}

// =============================================================================
// NATIVE STRINGS
// =============================================================================

unsafe fn release_mock_string(ptr: NonNull<u16>, len: usize) {
    LIVE_STRINGS.with(|live| live.set(live.get() - 1));
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
        ptr.as_ptr(),
        len + 1,
    )));
}

/// Allocate a NUL-terminated copy of `units` the way the native layer would.
pub(crate) fn alloc_string(units: &[u16]) -> Option<NativeWideString> {
    let mut buffer = Vec::with_capacity(units.len() + 1);
    buffer.extend_from_slice(units);
    buffer.push(0);
    let raw = Box::into_raw(buffer.into_boxed_slice()) as *mut u16;
    LIVE_STRINGS.with(|live| live.set(live.get() + 1));
    // SAFETY: `raw` holds `units.len()` units plus a terminator, allocated as
    // a boxed slice, which is exactly what `release_mock_string` frees.
    unsafe { NativeWideString::from_raw_parts(raw, units.len(), release_mock_string) }
}

/// Mock-allocated strings on this thread that have not been released yet.
pub fn live_strings() -> isize {
    LIVE_STRINGS.with(Cell::get)
}

// =============================================================================
// SHARED STATE
// =============================================================================

/// One environment creation request as the native layer received it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentRequest {
    pub browser_executable_folder: WideString,
    pub user_data_folder: WideString,
    pub options: NativeEnvironmentOptions,
}

pub(crate) struct MockState {
    tasks: RefCell<VecDeque<Task>>,
    failures: RefCell<HashMap<&'static str, Status>>,
    completion_failures: RefCell<HashMap<&'static str, Status>>,
    installed_version: RefCell<Option<String>>,
    navigation_error: Cell<Option<i32>>,
    script_results: RefCell<HashMap<String, String>>,
    environment_requests: RefCell<Vec<EnvironmentRequest>>,
    pages: RefCell<Vec<Weak<PageState>>>,

    navigations: RefCell<Vec<WideString>>,
    posted_messages: RefCell<Vec<WideString>>,
    reloads: Cell<usize>,
    stops: Cell<usize>,
    dev_tools_opened: Cell<usize>,
    core_webview_calls: Cell<usize>,

    live_environments: Cell<usize>,
    live_controllers: Cell<usize>,
    live_page_refs: Cell<usize>,

    next_token: Cell<i64>,
    next_navigation_id: Cell<u64>,
    next_script_id: Cell<u64>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            tasks: RefCell::default(),
            failures: RefCell::default(),
            completion_failures: RefCell::default(),
            installed_version: RefCell::new(Some(DEFAULT_INSTALLED_VERSION.to_owned())),
            navigation_error: Cell::new(None),
            script_results: RefCell::default(),
            environment_requests: RefCell::default(),
            pages: RefCell::default(),
            navigations: RefCell::default(),
            posted_messages: RefCell::default(),
            reloads: Cell::new(0),
            stops: Cell::new(0),
            dev_tools_opened: Cell::new(0),
            core_webview_calls: Cell::new(0),
            live_environments: Cell::new(0),
            live_controllers: Cell::new(0),
            live_page_refs: Cell::new(0),
            next_token: Cell::new(1),
            next_navigation_id: Cell::new(1),
            next_script_id: Cell::new(1),
        }
    }
}

impl MockState {
    /// Fail the call if a failure was injected for `operation`.
    pub(crate) fn check(&self, operation: &'static str) -> NativeResult<()> {
        match self.failures.borrow().get(operation) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    /// Status an asynchronous completion of `operation` reports.
    pub(crate) fn completion_status(&self, operation: &'static str) -> Status {
        self.completion_failures
            .borrow()
            .get(operation)
            .copied()
            .unwrap_or(Status::S_OK)
    }

    pub(crate) fn post(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub(crate) fn next_token(&self) -> super::EventToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        super::EventToken(token)
    }

    pub(crate) fn next_navigation_id(&self) -> u64 {
        let id = self.next_navigation_id.get();
        self.next_navigation_id.set(id + 1);
        id
    }

    pub(crate) fn next_script_id(&self) -> u64 {
        let id = self.next_script_id.get();
        self.next_script_id.set(id + 1);
        id
    }

    fn live_pages(&self) -> Vec<Rc<PageState>> {
        let mut pages = self.pages.borrow_mut();
        pages.retain(|page| page.strong_count() > 0);
        pages.iter().filter_map(Weak::upgrade).collect()
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

fn drop_one(counter: &Cell<usize>) {
    counter.set(counter.get().saturating_sub(1));
}

// =============================================================================
// RUNTIME
// =============================================================================

/// Handle to a mock runtime. Clones share the same native state.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Rc<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge runtime driven by this mock.
    pub fn runtime(&self) -> Runtime {
        Runtime::new(Rc::new(self.clone()))
    }

    // -- message loop --

    /// Deliver queued completions and events, including any queued while
    /// running. Returns how many were delivered.
    pub fn run_until_idle(&self) -> usize {
        let mut delivered = 0;
        loop {
            let task = self.state.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    delivered += 1;
                }
                None => return delivered,
            }
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.state.tasks.borrow().len()
    }

    // -- failure injection --

    /// Make every synchronous call of `operation` return `status`.
    pub fn fail(&self, operation: &'static str, status: Status) {
        self.state.failures.borrow_mut().insert(operation, status);
    }

    pub fn clear_failure(&self, operation: &'static str) {
        self.state.failures.borrow_mut().remove(operation);
    }

    /// Make the asynchronous completion of `operation` report `status` with
    /// no result.
    pub fn fail_completion(&self, operation: &'static str, status: Status) {
        self.state
            .completion_failures
            .borrow_mut()
            .insert(operation, status);
    }

    pub fn clear_completion_failure(&self, operation: &'static str) {
        self.state.completion_failures.borrow_mut().remove(operation);
    }

    /// Make navigations complete unsuccessfully with the given web error
    /// status, or successfully again with `None`.
    pub fn set_navigation_error(&self, web_error_status: Option<i32>) {
        self.state.navigation_error.set(web_error_status);
    }

    // -- scripted behavior --

    /// `None` simulates a machine without a runtime.
    pub fn set_installed_version(&self, version: Option<&str>) {
        *self.state.installed_version.borrow_mut() = version.map(str::to_owned);
    }

    /// JSON result `execute_script` reports for exactly this script text.
    pub fn set_script_result(&self, script: &str, json: &str) {
        self.state
            .script_results
            .borrow_mut()
            .insert(script.to_owned(), json.to_owned());
    }

    /// Queue a message from page script to every live page that has web
    /// messaging enabled.
    pub fn deliver_web_message(
        &self,
        source: impl Into<WideString>,
        json: impl Into<WideString>,
        text: Option<WideString>,
    ) {
        let source = source.into();
        let json = json.into();
        for page in self.state.live_pages() {
            let page = Rc::downgrade(&page);
            let (source, json, text) = (source.clone(), json.clone(), text.clone());
            self.state.post(move || {
                if let Some(page) = page.upgrade() {
                    page.dispatch_web_message(&source, &json, text.as_ref());
                }
            });
        }
    }

    // -- inspection --

    pub fn environment_requests(&self) -> Vec<EnvironmentRequest> {
        self.state.environment_requests.borrow().clone()
    }

    pub fn navigations(&self) -> Vec<WideString> {
        self.state.navigations.borrow().clone()
    }

    pub fn posted_messages(&self) -> Vec<WideString> {
        self.state.posted_messages.borrow().clone()
    }

    pub fn reloads(&self) -> usize {
        self.state.reloads.get()
    }

    pub fn stops(&self) -> usize {
        self.state.stops.get()
    }

    pub fn dev_tools_opened(&self) -> usize {
        self.state.dev_tools_opened.get()
    }

    /// How many times a controller handed out a page reference.
    pub fn core_webview_calls(&self) -> usize {
        self.state.core_webview_calls.get()
    }

    /// Event handlers currently registered on any live page.
    pub fn active_subscriptions(&self) -> usize {
        self.state
            .live_pages()
            .iter()
            .map(|page| page.subscription_count())
            .sum()
    }

    /// Scripts currently registered to run on document creation.
    pub fn document_scripts(&self) -> Vec<WideString> {
        self.state
            .live_pages()
            .iter()
            .flat_map(|page| page.document_scripts())
            .collect()
    }

    pub fn live_environments(&self) -> usize {
        self.state.live_environments.get()
    }

    pub fn live_controllers(&self) -> usize {
        self.state.live_controllers.get()
    }

    /// Outstanding native page references.
    pub fn live_page_refs(&self) -> usize {
        self.state.live_page_refs.get()
    }

    pub fn live_strings(&self) -> isize {
        live_strings()
    }

    fn queue_environment(&self, operation: &'static str, handler: EnvironmentCompletedHandler) {
        let runtime = Rc::downgrade(&self.state);
        self.state.post(move || {
            let Some(runtime) = runtime.upgrade() else {
                return;
            };
            let status = runtime.completion_status(operation);
            if status.is_success() {
                handler(status, Some(Box::new(MockEnvironment::new(runtime))));
            } else {
                handler(status, None);
            }
        });
    }
}

impl NativeRuntime for MockRuntime {
    fn create_environment(&self, handler: EnvironmentCompletedHandler) -> NativeResult<()> {
        self.state.check(op::CREATE_ENVIRONMENT)?;
        self.state
            .environment_requests
            .borrow_mut()
            .push(EnvironmentRequest::default());
        self.queue_environment(op::CREATE_ENVIRONMENT, handler);
        Ok(())
    }

    fn create_environment_with_options(
        &self,
        browser_executable_folder: &WideCString,
        user_data_folder: &WideCString,
        options: &NativeEnvironmentOptions,
        handler: EnvironmentCompletedHandler,
    ) -> NativeResult<()> {
        self.state.check(op::CREATE_ENVIRONMENT_WITH_OPTIONS)?;
        self.state
            .environment_requests
            .borrow_mut()
            .push(EnvironmentRequest {
                browser_executable_folder: browser_executable_folder.to_wide(),
                user_data_folder: user_data_folder.to_wide(),
                options: options.clone(),
            });
        self.queue_environment(op::CREATE_ENVIRONMENT_WITH_OPTIONS, handler);
        Ok(())
    }

    fn get_available_browser_version_string(
        &self,
        _browser_executable_folder: &WideCString,
    ) -> NativeResult<Option<NativeWideString>> {
        self.state.check(op::GET_AVAILABLE_BROWSER_VERSION)?;
        match self.state.installed_version.borrow().as_deref() {
            Some(version) => Ok(alloc_string(&WideString::from(version).into_units())),
            None => Err(Status::E_FILE_NOT_FOUND),
        }
    }

    fn compare_browser_versions(
        &self,
        version1: &WideCString,
        version2: &WideCString,
    ) -> NativeResult<i32> {
        self.state.check(op::COMPARE_BROWSER_VERSIONS)?;
        compare_versions(version1, version2)
            .map(|ordering| ordering as i32)
            .ok_or(Status::E_INVALIDARG)
    }
}

// =============================================================================
// VERSION COMPARISON
// =============================================================================

fn parse_version(version: &WideCString) -> Option<Vec<u64>> {
    let text = String::from_utf16(version.as_units()).ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.split('.').map(|part| part.parse().ok()).collect()
}

/// Dotted-numeric comparison; missing trailing components count as zero.
fn compare_versions(a: &WideCString, b: &WideCString) -> Option<Ordering> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    let component = |parts: &[u64], index: usize| parts.get(index).copied().unwrap_or(0);
    let ordering = (0..a.len().max(b.len()))
        .map(|index| component(&a, index).cmp(&component(&b, index)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal);
    Some(ordering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wv2_common::to_native;

    fn native(text: &str) -> WideCString {
        WideString::from(text).to_native()
    }

    #[test]
    fn version_ordering() {
        assert_eq!(compare_versions(&native("1.2.3.4"), &native("1.2.3.4")), Some(Ordering::Equal));
        assert_eq!(compare_versions(&native("1.2.3.4"), &native("1.2.3.5")), Some(Ordering::Less));
        assert_eq!(compare_versions(&native("1.2.10.0"), &native("1.2.9.0")), Some(Ordering::Greater));
        assert_eq!(compare_versions(&native("1.2"), &native("1.2.0.0")), Some(Ordering::Equal));
    }

    #[test]
    fn malformed_versions_are_rejected() {
        assert_eq!(compare_versions(&native(""), &native("1.0")), None);
        assert_eq!(compare_versions(&native("1.x"), &native("1.0")), None);
        assert_eq!(compare_versions(&to_native(&[0xD800]), &native("1.0")), None);
    }

    #[test]
    fn pump_delivers_tasks_queued_while_running() {
        let mock = MockRuntime::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let state = Rc::clone(&mock.state);
        let inner_order = Rc::clone(&order);
        mock.state.post(move || {
            inner_order.borrow_mut().push(1);
            let inner_order = Rc::clone(&inner_order);
            state.post(move || inner_order.borrow_mut().push(2));
        });

        assert_eq!(mock.pending_tasks(), 1);
        assert_eq!(mock.run_until_idle(), 2);
        assert_eq!(*order.borrow(), vec![1, 2]);
        assert_eq!(mock.pending_tasks(), 0);
    }

    #[test]
    fn injected_failures_are_sticky_until_cleared() {
        let mock = MockRuntime::new();
        mock.fail(op::RELOAD, Status::E_FAIL);
        assert_eq!(mock.state.check(op::RELOAD), Err(Status::E_FAIL));
        assert_eq!(mock.state.check(op::RELOAD), Err(Status::E_FAIL));
        assert_eq!(mock.state.check(op::STOP), Ok(()));

        mock.clear_failure(op::RELOAD);
        assert_eq!(mock.state.check(op::RELOAD), Ok(()));
    }

    #[test]
    fn allocated_strings_are_counted_until_released() {
        let before = live_strings();
        let native = alloc_string(&[0x68, 0x69]).unwrap();
        assert_eq!(live_strings(), before + 1);
        assert_eq!(native.to_wide(), "hi");
        drop(native);
        assert_eq!(live_strings(), before);
    }

    #[test]
    fn missing_runtime_reports_file_not_found() {
        let mock = MockRuntime::new();
        mock.set_installed_version(None);
        let result = mock.get_available_browser_version_string(&native(""));
        assert_eq!(result.err(), Some(Status::E_FILE_NOT_FOUND));
    }
}

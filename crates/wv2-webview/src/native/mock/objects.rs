use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wv2_common::{Bounds, NativeResult, NativeWideString, ParentWindow, Settings, Status, WideCString, WideString};

use super::{alloc_string, bump, drop_one, MockState};
use crate::native::{
    op, ControllerCompletedHandler, EventToken, NativeController, NativeEnvironment, NativePage,
    NativeSettings, NavigationCompletedArgs, NavigationCompletedEventHandler, StringCompletedHandler,
    WebMessageReceivedArgs, WebMessageReceivedEventHandler,
};

const ABOUT_BLANK: &str = "about:blank";

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub(super) struct MockEnvironment {
    runtime: Rc<MockState>,
}

impl MockEnvironment {
    pub(super) fn new(runtime: Rc<MockState>) -> Self {
        bump(&runtime.live_environments);
        Self { runtime }
    }
}

impl Drop for MockEnvironment {
    fn drop(&mut self) {
        drop_one(&self.runtime.live_environments);
    }
}

impl NativeEnvironment for MockEnvironment {
    fn create_controller(
        &self,
        parent_window: ParentWindow,
        handler: ControllerCompletedHandler,
    ) -> NativeResult<()> {
        self.runtime.check(op::CREATE_CONTROLLER)?;
        if parent_window.0 == 0 {
            return Err(Status::E_INVALIDARG);
        }
        let runtime = Rc::downgrade(&self.runtime);
        self.runtime.post(move || {
            let Some(runtime) = runtime.upgrade() else {
                return;
            };
            let status = runtime.completion_status(op::CREATE_CONTROLLER);
            if status.is_success() {
                handler(status, Some(Box::new(MockController::new(runtime))));
            } else {
                handler(status, None);
            }
        });
        Ok(())
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

struct MockController {
    runtime: Rc<MockState>,
    visible: Cell<bool>,
    bounds: Cell<Bounds>,
    closed: Cell<bool>,
    page: RefCell<Option<Rc<PageState>>>,
}

impl MockController {
    fn new(runtime: Rc<MockState>) -> Self {
        bump(&runtime.live_controllers);
        Self {
            runtime,
            visible: Cell::new(true),
            bounds: Cell::new(Bounds::default()),
            closed: Cell::new(false),
            page: RefCell::new(None),
        }
    }

    fn ensure_open(&self, operation: &'static str) -> NativeResult<()> {
        self.runtime.check(operation)?;
        if self.closed.get() {
            return Err(Status::E_INVALID_STATE);
        }
        Ok(())
    }
}

impl Drop for MockController {
    fn drop(&mut self) {
        drop_one(&self.runtime.live_controllers);
    }
}

impl NativeController for MockController {
    fn is_visible(&self) -> NativeResult<bool> {
        self.ensure_open(op::GET_IS_VISIBLE)?;
        Ok(self.visible.get())
    }

    fn set_is_visible(&self, visible: bool) -> NativeResult<()> {
        self.ensure_open(op::PUT_IS_VISIBLE)?;
        self.visible.set(visible);
        Ok(())
    }

    fn bounds(&self) -> NativeResult<Bounds> {
        self.ensure_open(op::GET_BOUNDS)?;
        Ok(self.bounds.get())
    }

    fn set_bounds(&self, bounds: Bounds) -> NativeResult<()> {
        self.ensure_open(op::PUT_BOUNDS)?;
        self.bounds.set(bounds);
        Ok(())
    }

    fn close(&self) -> NativeResult<()> {
        self.runtime.check(op::CLOSE)?;
        self.closed.set(true);
        if let Some(page) = self.page.borrow().as_ref() {
            page.closed.set(true);
        }
        Ok(())
    }

    fn core_webview(&self) -> NativeResult<Box<dyn NativePage>> {
        self.ensure_open(op::GET_CORE_WEBVIEW2)?;
        bump(&self.runtime.core_webview_calls);
        let page = Rc::clone(self.page.borrow_mut().get_or_insert_with(|| {
            let page = Rc::new(PageState::default());
            self.runtime.pages.borrow_mut().push(Rc::downgrade(&page));
            page
        }));
        Ok(Box::new(MockPage::new(Rc::clone(&self.runtime), page)))
    }
}

// =============================================================================
// PAGE STATE
// =============================================================================

type SharedNavigationHandler = Rc<RefCell<NavigationCompletedEventHandler>>;
type SharedWebMessageHandler = Rc<RefCell<WebMessageReceivedEventHandler>>;

/// The native page object, shared by every reference to it.
pub(super) struct PageState {
    closed: Cell<bool>,
    settings: Cell<Settings>,
    source: RefCell<WideString>,
    title: RefCell<WideString>,
    navigation_handlers: RefCell<Vec<(EventToken, SharedNavigationHandler)>>,
    message_handlers: RefCell<Vec<(EventToken, SharedWebMessageHandler)>>,
    document_scripts: RefCell<Vec<(WideString, WideString)>>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            closed: Cell::new(false),
            settings: Cell::new(Settings::default()),
            source: RefCell::new(WideString::from(ABOUT_BLANK)),
            title: RefCell::new(WideString::from(ABOUT_BLANK)),
            navigation_handlers: RefCell::default(),
            message_handlers: RefCell::default(),
            document_scripts: RefCell::default(),
        }
    }
}

impl PageState {
    pub(super) fn subscription_count(&self) -> usize {
        self.navigation_handlers.borrow().len() + self.message_handlers.borrow().len()
    }

    pub(super) fn document_scripts(&self) -> Vec<WideString> {
        self.document_scripts
            .borrow()
            .iter()
            .map(|(_, script)| script.clone())
            .collect()
    }

    fn dispatch_navigation(&self, args: NavigationCompletedArgs) {
        // Snapshot so handlers may (un)subscribe while being called.
        let handlers: Vec<_> = self
            .navigation_handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            let mut handler = handler.borrow_mut();
            (&mut **handler)(args);
        }
    }

    pub(super) fn dispatch_web_message(
        &self,
        source: &WideString,
        json: &WideString,
        text: Option<&WideString>,
    ) {
        if self.closed.get() || !self.settings.get().is_web_message_enabled {
            return;
        }
        let handlers: Vec<_> = self
            .message_handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            let args = WebMessageReceivedArgs {
                source: alloc_string(source.as_units()),
                json: alloc_string(json.as_units()),
                text: text.and_then(|text| alloc_string(text.as_units())),
            };
            let mut handler = handler.borrow_mut();
            (&mut **handler)(args);
        }
    }
}

/// Contents of the first `<title>` element, if any.
fn html_title(html: &WideString) -> Option<WideString> {
    let text = html.to_string_lossy();
    let lower = text.to_ascii_lowercase();
    let start = lower.find("<title>")? + "<title>".len();
    let end = start + lower[start..].find("</title>")?;
    Some(WideString::from(text[start..end].trim()))
}

// =============================================================================
// PAGE
// =============================================================================

struct MockPage {
    runtime: Rc<MockState>,
    state: Rc<PageState>,
}

impl MockPage {
    fn new(runtime: Rc<MockState>, state: Rc<PageState>) -> Self {
        bump(&runtime.live_page_refs);
        Self { runtime, state }
    }

    fn ensure_open(&self, operation: &'static str) -> NativeResult<()> {
        self.runtime.check(operation)?;
        if self.state.closed.get() {
            return Err(Status::E_INVALID_STATE);
        }
        Ok(())
    }

    fn queue_navigation(&self, source: WideString, title: WideString) {
        let navigation_id = self.runtime.next_navigation_id();
        let error = self.runtime.navigation_error.get();
        let page = Rc::downgrade(&self.state);
        self.runtime.post(move || {
            let Some(page) = page.upgrade() else {
                return;
            };
            let args = match error {
                None => {
                    *page.source.borrow_mut() = source;
                    *page.title.borrow_mut() = title;
                    NavigationCompletedArgs {
                        is_success: true,
                        web_error_status: 0,
                        navigation_id,
                    }
                }
                Some(web_error_status) => NavigationCompletedArgs {
                    is_success: false,
                    web_error_status,
                    navigation_id,
                },
            };
            page.dispatch_navigation(args);
        });
    }
}

impl Drop for MockPage {
    fn drop(&mut self) {
        drop_one(&self.runtime.live_page_refs);
    }
}

impl NativePage for MockPage {
    fn settings(&self) -> NativeResult<Box<dyn NativeSettings>> {
        self.ensure_open(op::GET_SETTINGS)?;
        Ok(Box::new(MockSettings {
            runtime: Rc::clone(&self.runtime),
            page: Rc::clone(&self.state),
        }))
    }

    fn navigate(&self, uri: &WideCString) -> NativeResult<()> {
        self.ensure_open(op::NAVIGATE)?;
        let uri = uri.to_wide();
        self.runtime.navigations.borrow_mut().push(uri.clone());
        self.queue_navigation(uri.clone(), uri);
        Ok(())
    }

    fn navigate_to_string(&self, html_content: &WideCString) -> NativeResult<()> {
        self.ensure_open(op::NAVIGATE_TO_STRING)?;
        let html = html_content.to_wide();
        let title = html_title(&html).unwrap_or_else(|| WideString::from(ABOUT_BLANK));
        self.runtime.navigations.borrow_mut().push(html);
        self.queue_navigation(WideString::from(ABOUT_BLANK), title);
        Ok(())
    }

    fn execute_script(
        &self,
        javascript: &WideCString,
        handler: StringCompletedHandler,
    ) -> NativeResult<()> {
        self.ensure_open(op::EXECUTE_SCRIPT)?;
        let script = javascript.to_wide().to_string_lossy();
        let runtime = Rc::downgrade(&self.runtime);
        let page = Rc::downgrade(&self.state);
        self.runtime.post(move || {
            let (Some(runtime), Some(page)) = (runtime.upgrade(), page.upgrade()) else {
                handler(Status::E_ABORT, None);
                return;
            };
            let status = runtime.completion_status(op::EXECUTE_SCRIPT);
            if !status.is_success() {
                handler(status, None);
                return;
            }
            let configured = runtime.script_results.borrow().get(&script).cloned();
            let result = match configured {
                Some(json) => json,
                None if script.trim() == "document.title" => {
                    serde_json::Value::String(page.title.borrow().to_string_lossy()).to_string()
                }
                None => "null".to_owned(),
            };
            handler(Status::S_OK, Some(WideString::from(result)));
        });
        Ok(())
    }

    fn reload(&self) -> NativeResult<()> {
        self.ensure_open(op::RELOAD)?;
        bump(&self.runtime.reloads);
        Ok(())
    }

    fn stop(&self) -> NativeResult<()> {
        self.ensure_open(op::STOP)?;
        bump(&self.runtime.stops);
        Ok(())
    }

    fn post_web_message_as_json(&self, json: &WideCString) -> NativeResult<()> {
        self.ensure_open(op::POST_WEB_MESSAGE_AS_JSON)?;
        let json = json.to_wide();
        if serde_json::from_str::<serde_json::Value>(&json.to_string_lossy()).is_err() {
            return Err(Status::E_INVALIDARG);
        }
        self.runtime.posted_messages.borrow_mut().push(json);
        Ok(())
    }

    fn document_title(&self) -> NativeResult<Option<NativeWideString>> {
        self.ensure_open(op::GET_DOCUMENT_TITLE)?;
        Ok(alloc_string(self.state.title.borrow().as_units()))
    }

    fn source(&self) -> NativeResult<Option<NativeWideString>> {
        self.ensure_open(op::GET_SOURCE)?;
        Ok(alloc_string(self.state.source.borrow().as_units()))
    }

    fn open_dev_tools_window(&self) -> NativeResult<()> {
        self.ensure_open(op::OPEN_DEV_TOOLS_WINDOW)?;
        if self.state.settings.get().are_dev_tools_enabled {
            bump(&self.runtime.dev_tools_opened);
        }
        Ok(())
    }

    fn add_navigation_completed(
        &self,
        handler: NavigationCompletedEventHandler,
    ) -> NativeResult<EventToken> {
        self.runtime.check(op::ADD_NAVIGATION_COMPLETED)?;
        let token = self.runtime.next_token();
        self.state
            .navigation_handlers
            .borrow_mut()
            .push((token, Rc::new(RefCell::new(handler))));
        Ok(token)
    }

    fn remove_navigation_completed(&self, token: EventToken) -> NativeResult<()> {
        self.runtime.check(op::REMOVE_NAVIGATION_COMPLETED)?;
        self.state
            .navigation_handlers
            .borrow_mut()
            .retain(|(registered, _)| *registered != token);
        Ok(())
    }

    fn add_web_message_received(
        &self,
        handler: WebMessageReceivedEventHandler,
    ) -> NativeResult<EventToken> {
        self.runtime.check(op::ADD_WEB_MESSAGE_RECEIVED)?;
        let token = self.runtime.next_token();
        self.state
            .message_handlers
            .borrow_mut()
            .push((token, Rc::new(RefCell::new(handler))));
        Ok(token)
    }

    fn remove_web_message_received(&self, token: EventToken) -> NativeResult<()> {
        self.runtime.check(op::REMOVE_WEB_MESSAGE_RECEIVED)?;
        self.state
            .message_handlers
            .borrow_mut()
            .retain(|(registered, _)| *registered != token);
        Ok(())
    }

    fn add_script_to_execute_on_document_created(
        &self,
        javascript: &WideCString,
        handler: StringCompletedHandler,
    ) -> NativeResult<()> {
        self.ensure_open(op::ADD_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED)?;
        let script = javascript.to_wide();
        let runtime = Rc::downgrade(&self.runtime);
        let page = Rc::downgrade(&self.state);
        self.runtime.post(move || {
            let (Some(runtime), Some(page)) = (runtime.upgrade(), page.upgrade()) else {
                handler(Status::E_ABORT, None);
                return;
            };
            let status = runtime.completion_status(op::ADD_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED);
            if !status.is_success() {
                handler(status, None);
                return;
            }
            let id = WideString::from(format!("{{mock-script-{}}}", runtime.next_script_id()));
            page.document_scripts
                .borrow_mut()
                .push((id.clone(), script));
            handler(Status::S_OK, Some(id));
        });
        Ok(())
    }

    fn remove_script_to_execute_on_document_created(&self, id: &WideCString) -> NativeResult<()> {
        self.ensure_open(op::REMOVE_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED)?;
        let id = id.to_wide();
        self.state
            .document_scripts
            .borrow_mut()
            .retain(|(registered, _)| *registered != id);
        Ok(())
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

struct MockSettings {
    runtime: Rc<MockState>,
    page: Rc<PageState>,
}

macro_rules! mock_toggles {
    ($($getter:ident / $setter:ident => $get_op:ident / $put_op:ident;)*) => {
        impl NativeSettings for MockSettings {
            $(
                fn $getter(&self) -> NativeResult<bool> {
                    self.runtime.check(op::$get_op)?;
                    Ok(self.page.settings.get().$getter)
                }

                fn $setter(&self, value: bool) -> NativeResult<()> {
                    self.runtime.check(op::$put_op)?;
                    let mut settings = self.page.settings.get();
                    settings.$getter = value;
                    self.page.settings.set(settings);
                    Ok(())
                }
            )*
        }
    };
}

mock_toggles! {
    is_script_enabled / set_is_script_enabled
        => GET_IS_SCRIPT_ENABLED / PUT_IS_SCRIPT_ENABLED;
    is_web_message_enabled / set_is_web_message_enabled
        => GET_IS_WEB_MESSAGE_ENABLED / PUT_IS_WEB_MESSAGE_ENABLED;
    are_default_script_dialogs_enabled / set_are_default_script_dialogs_enabled
        => GET_ARE_DEFAULT_SCRIPT_DIALOGS_ENABLED / PUT_ARE_DEFAULT_SCRIPT_DIALOGS_ENABLED;
    is_status_bar_enabled / set_is_status_bar_enabled
        => GET_IS_STATUS_BAR_ENABLED / PUT_IS_STATUS_BAR_ENABLED;
    are_dev_tools_enabled / set_are_dev_tools_enabled
        => GET_ARE_DEV_TOOLS_ENABLED / PUT_ARE_DEV_TOOLS_ENABLED;
    are_default_context_menus_enabled / set_are_default_context_menus_enabled
        => GET_ARE_DEFAULT_CONTEXT_MENUS_ENABLED / PUT_ARE_DEFAULT_CONTEXT_MENUS_ENABLED;
    is_zoom_control_enabled / set_is_zoom_control_enabled
        => GET_IS_ZOOM_CONTROL_ENABLED / PUT_IS_ZOOM_CONTROL_ENABLED;
    is_built_in_error_page_enabled / set_is_built_in_error_page_enabled
        => GET_IS_BUILT_IN_ERROR_PAGE_ENABLED / PUT_IS_BUILT_IN_ERROR_PAGE_ENABLED;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_read_from_markup() {
        let html = WideString::from("<html><head><TITLE> Hello </TITLE></head></html>");
        assert_eq!(html_title(&html), Some(WideString::from("Hello")));
        assert_eq!(html_title(&WideString::from("<p>no title</p>")), None);
    }
}

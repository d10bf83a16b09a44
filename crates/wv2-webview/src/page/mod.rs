//! The page handle: navigation, scripting, messaging and settings.
//!
//! A page subscribes to the native navigation-completed event once, when it
//! is constructed, and unsubscribes when the last handle drops. Navigation
//! continuations share a single slot: starting a navigation while another
//! is pending replaces the earlier continuation, which is then dropped
//! without being invoked. The slot is emptied before a continuation runs,
//! so a continuation may start the next navigation.

mod events;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};
use wv2_common::{from_native, BridgeError, NativeResult, NativeResultExt, Settings, WideString};

use crate::completion::Completion;
use crate::controller::Controller;
use crate::native::{native_text, op, EventToken, NativePage, NavigationCompletedArgs};

pub use events::{NavigationCompleted, WebMessage};

const OBJECT: &str = "ICoreWebView2";

/// Shared handle to a controller's page.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

struct PageInner {
    native: Box<dyn NativePage>,
    controller: Controller,
    pending_navigation: RefCell<Option<Completion<NavigationCompleted>>>,
    navigation_token: Cell<Option<EventToken>>,
    web_message_tokens: RefCell<Vec<EventToken>>,
}

/// Non-owning reference a controller keeps to its page.
#[derive(Default)]
pub(crate) struct WeakPage(Weak<PageInner>);

impl WeakPage {
    pub(crate) fn new() -> Self {
        Self(Weak::new())
    }

    pub(crate) fn upgrade(&self) -> Option<Page> {
        self.0.upgrade().map(|inner| Page { inner })
    }
}

impl Page {
    /// Wrap a native page and subscribe to its navigation events.
    pub(crate) fn new(native: Box<dyn NativePage>, controller: Controller) -> Result<Self, BridgeError> {
        let inner = Rc::new(PageInner {
            native,
            controller,
            pending_navigation: RefCell::new(None),
            navigation_token: Cell::new(None),
            web_message_tokens: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&inner);
        let token = inner
            .native
            .add_navigation_completed(Box::new(move |args| {
                if let Some(inner) = weak.upgrade() {
                    Page { inner }.dispatch_navigation_completed(args);
                }
            }))
            .for_operation(op::ADD_NAVIGATION_COMPLETED)?;
        inner.navigation_token.set(Some(token));

        debug!(token = token.0, "page created");
        Ok(Self { inner })
    }

    pub(crate) fn downgrade(&self) -> WeakPage {
        WeakPage(Rc::downgrade(&self.inner))
    }

    /// Whether both handles wrap the same native page.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The controller that owns this page.
    pub fn controller(&self) -> &Controller {
        &self.inner.controller
    }

    fn check_created(&self) -> Result<&dyn NativePage, BridgeError> {
        if self.inner.controller.is_closed() {
            return Err(BridgeError::not_created(OBJECT));
        }
        Ok(&*self.inner.native)
    }

    // =========================================================================
    // SETTINGS
    // =========================================================================

    /// Read all eight toggles.
    pub fn settings(&self) -> Result<Settings, BridgeError> {
        let native = self
            .check_created()?
            .settings()
            .for_operation(op::GET_SETTINGS)?;

        Ok(Settings {
            is_script_enabled: native
                .is_script_enabled()
                .for_operation(op::GET_IS_SCRIPT_ENABLED)?,
            is_web_message_enabled: native
                .is_web_message_enabled()
                .for_operation(op::GET_IS_WEB_MESSAGE_ENABLED)?,
            are_default_script_dialogs_enabled: native
                .are_default_script_dialogs_enabled()
                .for_operation(op::GET_ARE_DEFAULT_SCRIPT_DIALOGS_ENABLED)?,
            is_status_bar_enabled: native
                .is_status_bar_enabled()
                .for_operation(op::GET_IS_STATUS_BAR_ENABLED)?,
            are_dev_tools_enabled: native
                .are_dev_tools_enabled()
                .for_operation(op::GET_ARE_DEV_TOOLS_ENABLED)?,
            are_default_context_menus_enabled: native
                .are_default_context_menus_enabled()
                .for_operation(op::GET_ARE_DEFAULT_CONTEXT_MENUS_ENABLED)?,
            is_zoom_control_enabled: native
                .is_zoom_control_enabled()
                .for_operation(op::GET_IS_ZOOM_CONTROL_ENABLED)?,
            is_built_in_error_page_enabled: native
                .is_built_in_error_page_enabled()
                .for_operation(op::GET_IS_BUILT_IN_ERROR_PAGE_ENABLED)?,
        })
    }

    /// Write all eight toggles in declaration order.
    ///
    /// Not transactional: if one setter fails, the ones before it stay applied.
    pub fn set_settings(&self, settings: Settings) -> Result<(), BridgeError> {
        let native = self
            .check_created()?
            .settings()
            .for_operation(op::GET_SETTINGS)?;

        native
            .set_is_script_enabled(settings.is_script_enabled)
            .for_operation(op::PUT_IS_SCRIPT_ENABLED)?;
        native
            .set_is_web_message_enabled(settings.is_web_message_enabled)
            .for_operation(op::PUT_IS_WEB_MESSAGE_ENABLED)?;
        native
            .set_are_default_script_dialogs_enabled(settings.are_default_script_dialogs_enabled)
            .for_operation(op::PUT_ARE_DEFAULT_SCRIPT_DIALOGS_ENABLED)?;
        native
            .set_is_status_bar_enabled(settings.is_status_bar_enabled)
            .for_operation(op::PUT_IS_STATUS_BAR_ENABLED)?;
        native
            .set_are_dev_tools_enabled(settings.are_dev_tools_enabled)
            .for_operation(op::PUT_ARE_DEV_TOOLS_ENABLED)?;
        native
            .set_are_default_context_menus_enabled(settings.are_default_context_menus_enabled)
            .for_operation(op::PUT_ARE_DEFAULT_CONTEXT_MENUS_ENABLED)?;
        native
            .set_is_zoom_control_enabled(settings.is_zoom_control_enabled)
            .for_operation(op::PUT_IS_ZOOM_CONTROL_ENABLED)?;
        native
            .set_is_built_in_error_page_enabled(settings.is_built_in_error_page_enabled)
            .for_operation(op::PUT_IS_BUILT_IN_ERROR_PAGE_ENABLED)?;
        Ok(())
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Navigate to `uri`; `completion` runs when this navigation completes,
    /// unless a later navigation replaces it first.
    pub fn navigate(
        &self,
        uri: impl Into<WideString>,
        completion: impl FnOnce(NavigationCompleted) + 'static,
    ) -> Result<(), BridgeError> {
        self.check_created()?;
        let uri = native_text(uri, op::NAVIGATE)?;
        debug!(uri = ?uri, "navigate");
        self.begin_navigation(op::NAVIGATE, completion, |native| native.navigate(&uri))
    }

    /// Load `html_content` as the document.
    pub fn navigate_to_string(
        &self,
        html_content: impl Into<WideString>,
        completion: impl FnOnce(NavigationCompleted) + 'static,
    ) -> Result<(), BridgeError> {
        self.check_created()?;
        let html = native_text(html_content, op::NAVIGATE_TO_STRING)?;
        debug!(len = html.len(), "navigate to string");
        self.begin_navigation(op::NAVIGATE_TO_STRING, completion, |native| {
            native.navigate_to_string(&html)
        })
    }

    fn begin_navigation(
        &self,
        operation: &'static str,
        completion: impl FnOnce(NavigationCompleted) + 'static,
        issue: impl FnOnce(&dyn NativePage) -> NativeResult<()>,
    ) -> Result<(), BridgeError> {
        let native = self.check_created()?;

        let replaced = self
            .inner
            .pending_navigation
            .replace(Some(Completion::new(completion)));
        if replaced.is_some() {
            debug!("pending navigation continuation replaced");
        }
        drop(replaced);

        let result = issue(native).for_operation(operation);
        if result.is_err() {
            self.inner.pending_navigation.borrow_mut().take();
        }
        result
    }

    fn dispatch_navigation_completed(&self, args: NavigationCompletedArgs) {
        debug!(
            navigation_id = args.navigation_id,
            is_success = args.is_success,
            web_error_status = args.web_error_status,
            "navigation completed"
        );
        let pending = self.inner.pending_navigation.borrow_mut().take();
        if let Some(completion) = pending {
            completion.complete(NavigationCompleted {
                page: self.clone(),
                is_success: args.is_success,
                web_error_status: args.web_error_status,
                navigation_id: args.navigation_id,
            });
        }
    }

    pub fn reload(&self) -> Result<(), BridgeError> {
        self.check_created()?.reload().for_operation(op::RELOAD)
    }

    pub fn stop(&self) -> Result<(), BridgeError> {
        self.check_created()?.stop().for_operation(op::STOP)
    }

    // =========================================================================
    // SCRIPTING
    // =========================================================================

    /// Run `javascript` in the current document.
    ///
    /// `completion` receives the JSON-encoded result, or `None` if the
    /// script could not be run.
    pub fn execute_script(
        &self,
        javascript: impl Into<WideString>,
        completion: impl FnOnce(Option<WideString>) + 'static,
    ) -> Result<(), BridgeError> {
        let native = self.check_created()?;
        let javascript = native_text(javascript, op::EXECUTE_SCRIPT)?;
        let completion = Completion::new(completion);
        native
            .execute_script(
                &javascript,
                Box::new(move |status, result| {
                    let result = match result {
                        Some(json) if status.is_success() => Some(json),
                        _ => {
                            warn!(%status, "script completed without a result");
                            None
                        }
                    };
                    completion.complete(result);
                }),
            )
            .for_operation(op::EXECUTE_SCRIPT)
    }

    /// Register `javascript` to run before any page script of every new
    /// document. `completion` receives the id used to remove it again.
    pub fn add_script_to_execute_on_document_created(
        &self,
        javascript: impl Into<WideString>,
        completion: impl FnOnce(Option<WideString>) + 'static,
    ) -> Result<(), BridgeError> {
        let native = self.check_created()?;
        let javascript = native_text(javascript, op::ADD_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED)?;
        let completion = Completion::new(completion);
        native
            .add_script_to_execute_on_document_created(
                &javascript,
                Box::new(move |status, id| {
                    let id = match id {
                        Some(id) if status.is_success() => Some(id),
                        _ => {
                            warn!(%status, "document script registration completed without an id");
                            None
                        }
                    };
                    completion.complete(id);
                }),
            )
            .for_operation(op::ADD_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED)
    }

    pub fn remove_script_to_execute_on_document_created(
        &self,
        id: impl Into<WideString>,
    ) -> Result<(), BridgeError> {
        let native = self.check_created()?;
        let operation = op::REMOVE_SCRIPT_TO_EXECUTE_ON_DOCUMENT_CREATED;
        native
            .remove_script_to_execute_on_document_created(&native_text(id, operation)?)
            .for_operation(operation)
    }

    // =========================================================================
    // MESSAGING
    // =========================================================================

    /// Post JSON text to page script.
    pub fn post_web_message(&self, json: impl Into<WideString>) -> Result<(), BridgeError> {
        let native = self.check_created()?;
        native
            .post_web_message_as_json(&native_text(json, op::POST_WEB_MESSAGE_AS_JSON)?)
            .for_operation(op::POST_WEB_MESSAGE_AS_JSON)
    }

    /// Serialize `value` and post it to page script.
    pub fn post_web_message_value(&self, value: &serde_json::Value) -> Result<(), BridgeError> {
        self.post_web_message(value.to_string())
    }

    /// Call `handler` for every message page script posts.
    ///
    /// Subscriptions still registered when the page is dropped are removed then.
    pub fn add_web_message_received(
        &self,
        mut handler: impl FnMut(WebMessage) + 'static,
    ) -> Result<EventToken, BridgeError> {
        let token = self
            .check_created()?
            .add_web_message_received(Box::new(move |args| handler(WebMessage::from_native(args))))
            .for_operation(op::ADD_WEB_MESSAGE_RECEIVED)?;
        self.inner.web_message_tokens.borrow_mut().push(token);
        debug!(token = token.0, "web message handler added");
        Ok(token)
    }

    pub fn remove_web_message_received(&self, token: EventToken) -> Result<(), BridgeError> {
        self.check_created()?
            .remove_web_message_received(token)
            .for_operation(op::REMOVE_WEB_MESSAGE_RECEIVED)?;
        self.inner
            .web_message_tokens
            .borrow_mut()
            .retain(|registered| *registered != token);
        Ok(())
    }

    // =========================================================================
    // DOCUMENT
    // =========================================================================

    pub fn document_title(&self) -> Result<WideString, BridgeError> {
        let title = self
            .check_created()?
            .document_title()
            .for_operation(op::GET_DOCUMENT_TITLE)?;
        Ok(title.map(from_native).unwrap_or_default())
    }

    /// URI of the current document.
    pub fn source(&self) -> Result<WideString, BridgeError> {
        let source = self
            .check_created()?
            .source()
            .for_operation(op::GET_SOURCE)?;
        Ok(source.map(from_native).unwrap_or_default())
    }

    pub fn open_dev_tools_window(&self) -> Result<(), BridgeError> {
        self.check_created()?
            .open_dev_tools_window()
            .for_operation(op::OPEN_DEV_TOOLS_WINDOW)
    }
}

impl Drop for PageInner {
    fn drop(&mut self) {
        if let Some(token) = self.navigation_token.take() {
            let _ = self
                .native
                .remove_navigation_completed(token)
                .for_operation(op::REMOVE_NAVIGATION_COMPLETED);
        }
        for token in self.web_message_tokens.get_mut().drain(..) {
            let _ = self
                .native
                .remove_web_message_received(token)
                .for_operation(op::REMOVE_WEB_MESSAGE_RECEIVED);
        }
        debug!("page released");
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("navigation_pending", &self.inner.pending_navigation.borrow().is_some())
            .field("web_message_handlers", &self.inner.web_message_tokens.borrow().len())
            .finish_non_exhaustive()
    }
}

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};
use wv2_common::{BridgeError, Bounds, NativeResultExt};

use crate::environment::Environment;
use crate::native::{op, NativeController};
use crate::page::{Page, WeakPage};

const OBJECT: &str = "ICoreWebView2Controller";

/// Shared handle to the controller hosting a page inside a parent window.
///
/// `close()` is terminal: afterwards every operation, including another
/// `close()`, fails with [`BridgeError::NotCreated`].
#[derive(Clone)]
pub struct Controller {
    inner: Rc<ControllerInner>,
}

struct ControllerInner {
    native: RefCell<Option<Box<dyn NativeController>>>,
    environment: Environment,
    page: RefCell<WeakPage>,
}

impl Controller {
    pub(crate) fn new(native: Box<dyn NativeController>, environment: Environment) -> Self {
        Self {
            inner: Rc::new(ControllerInner {
                native: RefCell::new(Some(native)),
                environment,
                page: RefCell::new(WeakPage::new()),
            }),
        }
    }

    /// Run `f` against the live native controller.
    fn with_native<T>(
        &self,
        f: impl FnOnce(&dyn NativeController) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let native = self.inner.native.borrow();
        let native = native
            .as_deref()
            .ok_or_else(|| BridgeError::not_created(OBJECT))?;
        f(native)
    }

    pub fn visible(&self) -> Result<bool, BridgeError> {
        self.with_native(|native| native.is_visible().for_operation(op::GET_IS_VISIBLE))
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), BridgeError> {
        self.with_native(|native| native.set_is_visible(visible).for_operation(op::PUT_IS_VISIBLE))
    }

    pub fn bounds(&self) -> Result<Bounds, BridgeError> {
        self.with_native(|native| native.bounds().for_operation(op::GET_BOUNDS))
    }

    /// Bounds are passed through verbatim; no ordering of the edges is enforced.
    pub fn set_bounds(&self, bounds: Bounds) -> Result<(), BridgeError> {
        self.with_native(|native| native.set_bounds(bounds).for_operation(op::PUT_BOUNDS))
    }

    /// Close the controller and release the native reference.
    ///
    /// If the native close fails the controller stays open.
    pub fn close(&self) -> Result<(), BridgeError> {
        let native = self
            .inner
            .native
            .borrow_mut()
            .take()
            .ok_or_else(|| BridgeError::not_created(OBJECT))?;

        match native.close().for_operation(op::CLOSE) {
            Ok(()) => {
                debug!("controller closed");
                Ok(())
            }
            Err(err) => {
                *self.inner.native.borrow_mut() = Some(native);
                Err(err)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.native.borrow().is_none()
    }

    /// The environment this controller was created from.
    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    /// The controller's page.
    ///
    /// While a previously returned [`Page`] is still held, the same page is
    /// returned without touching the native layer. Fails once closed, even
    /// if such a page is still held.
    pub fn page(&self) -> Result<Page, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::not_created(OBJECT));
        }
        if let Some(page) = self.inner.page.borrow().upgrade() {
            return Ok(page);
        }

        let native = self.with_native(|native| {
            native.core_webview().for_operation(op::GET_CORE_WEBVIEW2)
        })?;
        let page = Page::new(native, self.clone()).inspect_err(|err| {
            warn!(error = %err, "page construction failed");
        })?;
        *self.inner.page.borrow_mut() = page.downgrade();
        Ok(page)
    }

    /// Whether both handles share the same native controller.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::mock::MockRuntime;
    use crate::testing::controller;
    use wv2_common::Status;

    // -- visibility and bounds --

    #[test]
    fn visibility_round_trips() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        assert!(controller.visible().unwrap());
        controller.set_visible(false).unwrap();
        assert!(!controller.visible().unwrap());
    }

    #[test]
    fn bounds_pass_through_verbatim() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        let inverted = Bounds::new(300, 200, -10, -20);
        controller.set_bounds(inverted).unwrap();
        assert_eq!(controller.bounds().unwrap(), inverted);
    }

    #[test]
    fn native_failure_names_operation() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        mock.fail(op::PUT_BOUNDS, Status::E_INVALIDARG);

        let err = controller.set_bounds(Bounds::from_size(10, 10)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ICoreWebView2Controller::put_Bounds failed: 0x80070057"
        );
    }

    // -- close --

    #[test]
    fn operations_after_close_fail_not_created() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        let held = controller.page().unwrap();
        controller.close().unwrap();

        assert!(controller.is_closed());
        assert!(controller.visible().unwrap_err().is_not_created());
        assert!(controller.set_visible(true).unwrap_err().is_not_created());
        assert!(controller.bounds().unwrap_err().is_not_created());
        assert!(controller.set_bounds(Bounds::default()).unwrap_err().is_not_created());
        assert!(controller.page().unwrap_err().is_not_created());
        drop(held);
    }

    #[test]
    fn held_page_is_not_returned_after_close() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        let held = controller.page().unwrap();
        controller.close().unwrap();

        let err = controller.page().unwrap_err();
        assert!(err.is_not_created());
        assert_eq!(err.to_string(), "ICoreWebView2Controller not created");
        assert_eq!(mock.core_webview_calls(), 1);
        drop(held);
    }

    #[test]
    fn second_close_fails_not_created() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        controller.close().unwrap();

        let err = controller.close().unwrap_err();
        assert!(err.is_not_created());
        assert_eq!(err.to_string(), "ICoreWebView2Controller not created");
    }

    #[test]
    fn close_releases_native_reference() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        assert_eq!(mock.live_controllers(), 1);
        controller.close().unwrap();
        assert_eq!(mock.live_controllers(), 0);
    }

    #[test]
    fn failed_close_keeps_controller_open() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        mock.fail(op::CLOSE, Status::E_FAIL);

        assert_eq!(controller.close().unwrap_err().status(), Some(Status::E_FAIL));
        assert!(!controller.is_closed());
        assert!(controller.visible().is_ok());

        mock.clear_failure(op::CLOSE);
        controller.close().unwrap();
        assert!(controller.is_closed());
    }

    // -- page memoization --

    #[test]
    fn page_is_memoized_while_held() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);

        let first = controller.page().unwrap();
        let second = controller.page().unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(mock.core_webview_calls(), 1);
        assert_eq!(mock.live_page_refs(), 1);
    }

    #[test]
    fn page_is_reacquired_after_release() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);

        drop(controller.page().unwrap());
        assert_eq!(mock.live_page_refs(), 0);

        let _page = controller.page().unwrap();
        assert_eq!(mock.core_webview_calls(), 2);
        assert_eq!(mock.live_page_refs(), 1);
    }

    #[test]
    fn page_query_failure_is_reported() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        mock.fail(op::GET_CORE_WEBVIEW2, Status::E_NOINTERFACE);

        let err = controller.page().unwrap_err();
        assert_eq!(err.status(), Some(Status::E_NOINTERFACE));
    }

    #[test]
    fn clones_share_state() {
        let mock = MockRuntime::new();
        let controller = controller(&mock);
        let clone = controller.clone();
        assert!(clone.ptr_eq(&controller));
        clone.close().unwrap();
        assert!(controller.is_closed());
    }
}

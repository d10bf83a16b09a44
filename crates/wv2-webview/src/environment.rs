use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};
use wv2_common::{BridgeError, NativeResultExt, ParentWindow};

use crate::controller::Controller;
use crate::native::{op, NativeEnvironment};

const OBJECT: &str = "ICoreWebView2Environment";

/// Shared handle to a browser runtime environment.
///
/// Cloning shares the same native environment. Controllers keep the
/// environment they were created from alive.
#[derive(Clone)]
pub struct Environment {
    inner: Rc<EnvironmentInner>,
}

struct EnvironmentInner {
    native: Option<Box<dyn NativeEnvironment>>,
}

impl Environment {
    pub(crate) fn new(native: Box<dyn NativeEnvironment>) -> Self {
        Self {
            inner: Rc::new(EnvironmentInner {
                native: Some(native),
            }),
        }
    }

    /// An environment whose native creation never finished.
    #[cfg(test)]
    pub(crate) fn uncreated() -> Self {
        Self {
            inner: Rc::new(EnvironmentInner { native: None }),
        }
    }

    pub fn is_created(&self) -> bool {
        self.inner.native.is_some()
    }

    /// Whether both handles share the same native environment.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Create a controller hosted in `parent_window`.
    ///
    /// `completion` receives `None` when the native creation reports failure.
    pub fn create_controller(
        &self,
        parent_window: ParentWindow,
        completion: impl FnOnce(Option<Controller>) + 'static,
    ) -> Result<(), BridgeError> {
        let native = self
            .inner
            .native
            .as_deref()
            .ok_or_else(|| BridgeError::not_created(OBJECT))?;

        debug!(parent_window = parent_window.0, "creating controller");
        let environment = self.clone();
        native
            .create_controller(
                parent_window,
                Box::new(move |status, native| {
                    let controller = match native {
                        Some(native) if status.is_success() => {
                            debug!(parent_window = parent_window.0, "controller created");
                            Some(Controller::new(native, environment))
                        }
                        _ => {
                            warn!(%status, "controller creation completed without a controller");
                            None
                        }
                    };
                    completion(controller);
                }),
            )
            .for_operation(op::CREATE_CONTROLLER)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("created", &self.is_created())
            .finish()
    }
}

//! Fixtures shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use wv2_common::ParentWindow;

use crate::controller::Controller;
use crate::environment::Environment;
use crate::native::mock::MockRuntime;
use crate::page::Page;

pub(crate) const WINDOW: ParentWindow = ParentWindow(0x00C0_FFEE);

/// A shared log and a closure that appends to it.
pub(crate) fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(T) + Clone + 'static) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    (log, move |value| sink.borrow_mut().push(value))
}

pub(crate) fn environment(mock: &MockRuntime) -> Environment {
    let (created, sink) = recorder::<Option<Environment>>();
    mock.runtime().create_environment(sink).unwrap();
    mock.run_until_idle();
    let environment = created.borrow_mut().pop().flatten();
    environment.expect("mock environment")
}

pub(crate) fn controller(mock: &MockRuntime) -> Controller {
    let (created, sink) = recorder::<Option<Controller>>();
    environment(mock).create_controller(WINDOW, sink).unwrap();
    mock.run_until_idle();
    let controller = created.borrow_mut().pop().flatten();
    controller.expect("mock controller")
}

pub(crate) fn page(mock: &MockRuntime) -> Page {
    controller(mock).page().unwrap()
}

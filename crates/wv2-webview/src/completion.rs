//! One-shot continuations.
//!
//! Every asynchronous bridge operation takes its continuation by value and
//! consumes it at most once. [`oneshot`] adapts a continuation into a future
//! for hosts that prefer `async` code; the future observes a dropped
//! continuation as [`BridgeError::Abandoned`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot as channel;
use wv2_common::BridgeError;

/// A continuation that can be invoked exactly once.
pub struct Completion<T> {
    callback: Box<dyn FnOnce(T)>,
}

impl<T> Completion<T> {
    pub fn new(callback: impl FnOnce(T) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Invoke the continuation, consuming it.
    pub fn complete(self, value: T) {
        (self.callback)(value)
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion { .. }")
    }
}

/// A continuation paired with the future it resolves.
pub fn oneshot<T: 'static>() -> (impl FnOnce(T) + 'static, CompletionFuture<T>) {
    let (sender, receiver) = channel::channel();
    let complete = move |value: T| {
        // The receiver may already be gone; the value is simply discarded.
        let _ = sender.send(value);
    };
    (complete, CompletionFuture { receiver })
}

/// Resolves when the paired continuation runs, or fails with
/// [`BridgeError::Abandoned`] once it is dropped unused.
#[must_use = "futures do nothing unless polled"]
pub struct CompletionFuture<T> {
    receiver: channel::Receiver<T>,
}

impl<T> CompletionFuture<T> {
    /// Non-blocking check for a result.
    ///
    /// `Ok(None)` means the continuation is still pending.
    pub fn try_take(&mut self) -> Result<Option<T>, BridgeError> {
        self.receiver
            .try_recv()
            .map_err(|_canceled| BridgeError::Abandoned)
    }
}

impl<T> Future for CompletionFuture<T> {
    type Output = Result<T, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_canceled| BridgeError::Abandoned))
    }
}

impl<T> fmt::Debug for CompletionFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionFuture").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn completion_runs_its_callback_once() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let completion = Completion::new(move |value: u32| {
            assert_eq!(value, 7);
            seen.set(seen.get() + 1);
        });
        completion.complete(7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn dropped_completion_never_runs() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        drop(Completion::new(move |_: ()| seen.set(seen.get() + 1)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn oneshot_resolves_with_value() {
        let (complete, future) = oneshot::<String>();
        complete("done".to_owned());
        assert_eq!(block_on(future).unwrap(), "done");
    }

    #[test]
    fn oneshot_reports_abandoned_continuation() {
        let (complete, future) = oneshot::<u8>();
        drop(complete);
        assert!(matches!(block_on(future), Err(BridgeError::Abandoned)));
    }

    #[test]
    fn try_take_distinguishes_pending() {
        let (complete, mut future) = oneshot::<u8>();
        assert!(matches!(future.try_take(), Ok(None)));
        complete(3);
        assert!(matches!(future.try_take(), Ok(Some(3))));
    }
}

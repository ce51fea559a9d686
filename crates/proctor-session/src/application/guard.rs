//! Stop guard shared between a background task and its owner
//!
//! Callbacks run while holding the guard, and `stop()` takes the same lock,
//! so once `stop()` returns no callback can start. The lock is reentrant
//! because a callback may itself stop the task that invoked it.

use parking_lot::ReentrantMutex;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

#[derive(Debug, Default)]
pub(crate) struct CallbackGuard {
    stopped: ReentrantMutex<Cell<bool>>,
}

impl CallbackGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `f` unless stopped. Returns false if the guard was already stopped.
    pub(crate) fn run<F: FnOnce()>(&self, f: F) -> bool {
        let stopped = self.stopped.lock();
        if stopped.get() {
            return false;
        }
        f();
        true
    }

    /// Mark stopped. Returns true only for the call that actually stopped it.
    pub(crate) fn stop(&self) -> bool {
        let stopped = self.stopped.lock();
        !stopped.replace(true)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.lock().get()
    }
}

/// Invoke a host callback, containing any panic so the calling loop survives.
pub(crate) fn invoke_handler<F: FnOnce()>(name: &'static str, f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(handler = name, "Session callback panicked; continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_until_stopped() {
        let guard = CallbackGuard::new();
        let mut hits = 0;
        assert!(guard.run(|| hits += 1));
        assert!(guard.stop());
        assert!(!guard.stop());
        assert!(!guard.run(|| hits += 1));
        assert_eq!(hits, 1);
        assert!(guard.is_stopped());
    }

    #[test]
    fn test_stop_from_inside_callback() {
        let guard = CallbackGuard::new();
        assert!(guard.run(|| {
            assert!(guard.stop());
        }));
        assert!(guard.is_stopped());
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let mut after = false;
        invoke_handler("test", || panic!("host bug"));
        invoke_handler("test", || after = true);
        assert!(after);
    }
}

//! Cancelable registration handles.
//!
//! A [`Registration`] represents one active subscription or poll loop. Its
//! only operation is [`cancel`](Registration::cancel): the first call runs
//! the teardown closure and returns its result, every later call is a no-op
//! returning `false`. The handle is `Send + Sync`, so cancellation may race
//! with an in-flight poll iteration or with another cancel call without
//! running teardown twice.

use std::sync::Mutex;

type CancelFn = Box<dyn FnOnce() -> bool + Send>;

/// Idempotent cancel-once handle.
///
/// Returned by [`SubscribableSource::subscribe`](crate::SubscribableSource::subscribe)
/// (removes one subscriber) and by [`FetchEngine::poll`](crate::FetchEngine::poll)
/// (stops one poll loop and frees its consumer).
pub struct Registration {
    cancel: Mutex<Option<CancelFn>>,
}

impl Registration {
    /// Wraps a teardown closure.
    ///
    /// The closure reports whether the registration was still effective, e.g.
    /// whether the subscriber was still present or the loop still running.
    pub fn new(cancel: impl FnOnce() -> bool + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A registration whose cancellation has nothing to tear down.
    pub fn noop() -> Self {
        Self::new(|| true)
    }

    /// Cancels the registration.
    ///
    /// Returns the teardown closure's result on the first call and `false`
    /// on every subsequent call.
    pub fn cancel(&self) -> bool {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match cancel {
            Some(cancel) => cancel(),
            None => false,
        }
    }

    /// Whether [`cancel`](Registration::cancel) has already been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn cancel_runs_teardown_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let registration = Registration::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            true
        });

        assert!(!registration.is_cancelled());
        assert!(registration.cancel());
        assert!(!registration.cancel());
        assert!(registration.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn teardown_result_is_reported() {
        let registration = Registration::new(|| false);
        assert!(!registration.cancel());
    }
}

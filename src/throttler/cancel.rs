//! Cooperative cancellation for callers blocked on a throttler.
//!
//! A [`CancellationToken`] is handed to
//! [`Throttler::execute_cancellable`](crate::Throttler::execute_cancellable).
//! Cancelling it wakes every caller currently sleeping on that token; they
//! return [`Outcome::Cancelled`](crate::Outcome::Cancelled) without running
//! their action.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Clonable cancellation signal. All clones observe the same state.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use throttler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let waiter = token.clone();
///
/// let handle = std::thread::spawn(move || waiter.wait_timeout(Duration::from_secs(30)));
/// token.cancel();
///
/// assert!(handle.join().unwrap());
/// ```
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes all waiters. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !*cancelled {
            *cancelled = true;
            debug!("Cancellation requested");
        }
        drop(cancelled);
        self.inner.wakeup.notify_all();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for up to `timeout`, returning early if the token is cancelled.
    ///
    /// Returns `true` if the token was cancelled, `false` if the full timeout
    /// elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .inner
            .wakeup
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

//! # Core Throttler Implementation
//!
//! A discrete windowed token bucket. Each window hands out `limit` tokens;
//! once they are spent, further calls are dropped or made to wait until the
//! window expires, at which point the bucket refills completely.
//!
//! ```text
//!     limit = 3, interval = 1s
//!
//!     t=0.0  [🪙🪙🪙]  execute ✅  execute ✅  execute ✅
//!     t=0.4  [      ]  execute ❌ (Drop)  /  sleep 0.6s (Block)
//!     t=1.0  [🪙🪙🪙]  window expired, bucket refilled
//! ```
//!
//! ## Locking
//!
//! The token count and the window deadline form one unit and live together
//! behind a single `Mutex`. The lock is held only for the decision itself:
//! blocked callers sleep without it, and the caller's action always runs
//! after it has been released.
//!
//! ```text
//!     execute(action)
//!          │
//!          ▼
//!     ┌──────────────── lock ────────────────┐
//!     │ window expired? ──Yes──► refill       │
//!     │ token left? ──Yes──► take it ─────────┼──► run action
//!     │      │No                              │
//!     │      ├─ Drop  ──────────────────────── ┼──► return
//!     │      └─ Block ── wait = end - now ─── ┼──► sleep, loop
//!     └───────────────────────────────────────┘
//! ```

use super::{
    cancel::CancellationToken,
    config::{LimitingBehavior, ThrottlerConfig},
    error::{Cancelled, ConfigError},
    metrics::ThrottlerMetrics,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// What happened to a call made through a throttler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// A token was granted and the action ran.
    Executed,

    /// No token was available and the call was dropped.
    Dropped,

    /// The caller was waiting for the next window and its cancellation
    /// token fired. The action did not run.
    Cancelled,
}

impl Outcome {
    /// `true` if the action ran.
    #[inline]
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed)
    }

    /// Separates cancellation from the normal outcomes.
    ///
    /// `Executed` and `Dropped` become `Ok(true)` and `Ok(false)`;
    /// `Cancelled` becomes `Err(Cancelled)` so it can be propagated with `?`.
    pub fn into_result(self) -> Result<bool, Cancelled> {
        match self {
            Self::Executed => Ok(true),
            Self::Dropped => Ok(false),
            Self::Cancelled => Err(Cancelled),
        }
    }
}

/// State guarded by the bucket lock.
#[derive(Debug)]
struct Bucket {
    remaining: u64,
    window_end: Instant,
    last_used: Instant,
}

/// Result of one pass through the critical section.
enum Decision {
    Granted,
    Denied,
    Wait(Duration),
}

/// Limits how many times work may run per time window.
///
/// Construct once and share it (by reference or through an `Arc`) with every
/// caller that must count against the same limit.
///
/// ## Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::thread;
/// use throttler::Throttler;
///
/// // At most 100 sends per minute; the rest are dropped
/// let throttler = Arc::new(Throttler::new(100).unwrap());
/// let sent = Arc::new(AtomicUsize::new(0));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let throttler = throttler.clone();
///         let sent = sent.clone();
///         thread::spawn(move || {
///             for _ in 0..250 {
///                 throttler.execute(|| {
///                     sent.fetch_add(1, Ordering::Relaxed);
///                 });
///             }
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(sent.load(Ordering::Relaxed), 100);
/// ```
pub struct Throttler {
    bucket: Mutex<Bucket>,

    limit: u64,
    interval: Duration,
    behavior: LimitingBehavior,

    total_executed: AtomicU64,
    total_dropped: AtomicU64,
    total_cancelled: AtomicU64,
    total_refills: AtomicU64,
    total_waits: AtomicU64,
    max_wait_ns: AtomicU64,
}

impl Throttler {
    /// Creates a throttler allowing `limit` executions per 60 second window,
    /// dropping the overflow.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroLimit`] if `limit` is 0.
    pub fn new(limit: u64) -> Result<Self, ConfigError> {
        Self::with_config(ThrottlerConfig::new(limit))
    }

    /// Creates a throttler from a configuration.
    ///
    /// # Errors
    ///
    /// Any error from [`ThrottlerConfig::validate`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttler::{LimitingBehavior, Throttler, ThrottlerConfig};
    ///
    /// let config = ThrottlerConfig::per_second(10).with_behavior(LimitingBehavior::Block);
    /// let throttler = Throttler::with_config(config)?;
    /// assert_eq!(throttler.limit(), 10);
    /// # Ok::<(), throttler::ConfigError>(())
    /// ```
    pub fn with_config(config: ThrottlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(&config))
    }

    /// Builds a throttler from a configuration that already passed validation.
    pub(crate) fn from_validated(config: &ThrottlerConfig) -> Self {
        let now = Instant::now();

        Self {
            bucket: Mutex::new(Bucket {
                remaining: config.limit,
                window_end: deadline(now, config.interval),
                last_used: now,
            }),
            limit: config.limit,
            interval: config.interval,
            behavior: config.behavior,
            total_executed: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            total_cancelled: AtomicU64::new(0),
            total_refills: AtomicU64::new(0),
            total_waits: AtomicU64::new(0),
            max_wait_ns: AtomicU64::new(0),
        }
    }

    /// Runs `action` on the calling thread if a token is available.
    ///
    /// Under [`LimitingBehavior::Drop`] a call made after the window's tokens
    /// are spent returns without running `action`. Under
    /// [`LimitingBehavior::Block`] the calling thread sleeps until the window
    /// expires and then tries again.
    #[inline]
    pub fn execute<F: FnOnce()>(&self, action: F) {
        self.try_execute(action);
    }

    /// Like [`execute`](Self::execute), but reports whether `action` ran.
    ///
    /// Never returns [`Outcome::Cancelled`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttler::{Outcome, Throttler};
    ///
    /// let throttler = Throttler::new(1).unwrap();
    /// assert_eq!(throttler.try_execute(|| {}), Outcome::Executed);
    /// assert_eq!(throttler.try_execute(|| {}), Outcome::Dropped);
    /// ```
    pub fn try_execute<F: FnOnce()>(&self, action: F) -> Outcome {
        let outcome = self.acquire(None);
        if outcome.is_executed() {
            action();
        }
        outcome
    }

    /// Like [`try_execute`](Self::try_execute), but a wait for the next
    /// window is abandoned as soon as `cancel` fires.
    ///
    /// Cancellation only interrupts waiting: if a token is available the
    /// action runs even when `cancel` has already fired.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttler::{CancellationToken, LimitingBehavior, Outcome, ThrottlerBuilder};
    ///
    /// let throttler = ThrottlerBuilder::new()
    ///     .limit(1)
    ///     .interval_ms(60_000)
    ///     .behavior(LimitingBehavior::Block)
    ///     .build()
    ///     .unwrap();
    ///
    /// let cancel = CancellationToken::new();
    /// cancel.cancel();
    ///
    /// assert_eq!(throttler.execute_cancellable(|| {}, &cancel), Outcome::Executed);
    /// // The next call would wait a minute; the fired token aborts the wait
    /// assert_eq!(throttler.execute_cancellable(|| {}, &cancel), Outcome::Cancelled);
    /// ```
    pub fn execute_cancellable<F: FnOnce()>(
        &self,
        action: F,
        cancel: &CancellationToken,
    ) -> Outcome {
        let outcome = self.acquire(Some(cancel));
        if outcome.is_executed() {
            action();
        }
        outcome
    }

    /// Obtains a token, dropping or waiting per the configured behavior.
    fn acquire(&self, cancel: Option<&CancellationToken>) -> Outcome {
        loop {
            let decision = {
                let mut bucket = self.lock();
                self.decide(&mut bucket, Instant::now())
            };

            match decision {
                Decision::Granted => {
                    self.total_executed.fetch_add(1, Ordering::Relaxed);
                    return Outcome::Executed;
                }
                Decision::Denied => {
                    self.total_dropped.fetch_add(1, Ordering::Relaxed);
                    trace!("Throttled call dropped (limit: {})", self.limit);
                    return Outcome::Dropped;
                }
                Decision::Wait(wait) => {
                    self.total_waits.fetch_add(1, Ordering::Relaxed);
                    trace!("Throttled call waiting {:?} for the next window", wait);

                    let started = Instant::now();
                    let cancelled = match cancel {
                        Some(token) => token.wait_timeout(wait),
                        None => {
                            thread::sleep(wait);
                            false
                        }
                    };
                    let waited = started.elapsed().as_nanos().min(u64::MAX as u128) as u64;
                    self.max_wait_ns.fetch_max(waited, Ordering::Relaxed);

                    if cancelled {
                        self.total_cancelled.fetch_add(1, Ordering::Relaxed);
                        debug!("Throttled call cancelled while waiting");
                        return Outcome::Cancelled;
                    }
                    // The deadline is re-read under the lock on the next pass.
                }
            }
        }
    }

    /// One pass of the token decision. Must be called with the lock held.
    fn decide(&self, bucket: &mut Bucket, now: Instant) -> Decision {
        bucket.last_used = now;
        self.refill_if_expired(bucket, now);

        if bucket.remaining > 0 {
            bucket.remaining -= 1;
            return Decision::Granted;
        }

        match self.behavior {
            LimitingBehavior::Drop => Decision::Denied,
            LimitingBehavior::Block => {
                Decision::Wait(bucket.window_end.saturating_duration_since(now))
            }
        }
    }

    /// Starts a fresh, full window if the current one has expired.
    ///
    /// Runs before the token check: leftover tokens from an expired window
    /// are discarded, never carried into the next one.
    fn refill_if_expired(&self, bucket: &mut Bucket, now: Instant) {
        if now < bucket.window_end {
            return;
        }

        let refilled = self.limit - bucket.remaining;
        bucket.remaining = self.limit;
        bucket.window_end = deadline(now, self.interval);
        self.total_refills.fetch_add(1, Ordering::Relaxed);
        debug!("Refilled {} tokens, next window in {:?}", refilled, self.interval);
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Bucket> {
        // Every update to the bucket is a plain store, so a panic elsewhere
        // cannot leave it half-written.
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum executions per window.
    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window length.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Overflow policy.
    #[inline]
    pub fn behavior(&self) -> LimitingBehavior {
        self.behavior
    }

    /// The configuration this throttler was built from.
    pub fn config(&self) -> ThrottlerConfig {
        ThrottlerConfig {
            limit: self.limit,
            interval: self.interval,
            behavior: self.behavior,
        }
    }

    /// Tokens left in the current window, refilling first if it has expired.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttler::Throttler;
    ///
    /// let throttler = Throttler::new(5).unwrap();
    /// throttler.execute(|| {});
    /// assert_eq!(throttler.remaining_tokens(), 4);
    /// ```
    pub fn remaining_tokens(&self) -> u64 {
        let mut bucket = self.lock();
        self.refill_if_expired(&mut bucket, Instant::now());
        bucket.remaining
    }

    /// `true` if no call has gone through this throttler for at least `idle`.
    pub fn is_idle(&self, idle: Duration) -> bool {
        let last_used = self.lock().last_used;
        last_used.elapsed() >= idle
    }

    /// `true` if the throttler is idle for at least `idle` and its current
    /// window has ended, so replacing it with a fresh one cannot grant more
    /// than `limit` executions in any window.
    pub(crate) fn is_expired_and_idle(&self, idle: Duration) -> bool {
        let now = Instant::now();
        let bucket = self.lock();
        now >= bucket.window_end && now.saturating_duration_since(bucket.last_used) >= idle
    }

    /// Refills the bucket, starts a new window and zeroes the counters.
    pub fn reset(&self) {
        let now = Instant::now();
        {
            let mut bucket = self.lock();
            bucket.remaining = self.limit;
            bucket.window_end = deadline(now, self.interval);
            bucket.last_used = now;
        }

        self.total_executed.store(0, Ordering::Relaxed);
        self.total_dropped.store(0, Ordering::Relaxed);
        self.total_cancelled.store(0, Ordering::Relaxed);
        self.total_refills.store(0, Ordering::Relaxed);
        self.total_waits.store(0, Ordering::Relaxed);
        self.max_wait_ns.store(0, Ordering::Relaxed);
    }

    /// Snapshot of the lifetime counters and the current window.
    pub fn metrics(&self) -> ThrottlerMetrics {
        let remaining_tokens = self.lock().remaining;

        ThrottlerMetrics {
            total_executed: self.total_executed.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
            total_refills: self.total_refills.load(Ordering::Relaxed),
            total_waits: self.total_waits.load(Ordering::Relaxed),
            max_wait_ns: self.max_wait_ns.load(Ordering::Relaxed),
            remaining_tokens,
            limit: self.limit,
        }
    }
}

impl std::fmt::Debug for Throttler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttler")
            .field("limit", &self.limit)
            .field("interval", &self.interval)
            .field("behavior", &self.behavior)
            .field("remaining_tokens", &self.lock().remaining)
            .finish()
    }
}

/// `now + interval`, saturating at the latest representable `Instant`.
fn deadline(now: Instant, interval: Duration) -> Instant {
    if let Some(end) = now.checked_add(interval) {
        return end;
    }

    let mut end = now;
    let mut remaining = interval;
    let mut step = interval;
    while !step.is_zero() && !remaining.is_zero() {
        match end.checked_add(step) {
            Some(next) => {
                end = next;
                remaining -= step;
                step = step.min(remaining);
            }
            None => step /= 2,
        }
    }
    end
}

/// Anything that conditionally runs units of work.
///
/// Lets callers take "some throttler" without caring whether it is a real
/// [`Throttler`] or [`Unthrottled`] (for tests and disabled limits).
///
/// ```rust
/// use throttler::{CommandThrottler, Throttler, Unthrottled};
///
/// fn notify_all<T: CommandThrottler>(throttler: &T, users: &[&str]) -> usize {
///     let mut sent = 0;
///     for _user in users {
///         throttler.execute(|| sent += 1);
///     }
///     sent
/// }
///
/// let users = ["ana", "bo", "cy"];
/// assert_eq!(notify_all(&Throttler::new(2).unwrap(), &users), 2);
/// assert_eq!(notify_all(&Unthrottled, &users), 3);
/// ```
pub trait CommandThrottler {
    /// Runs `action` if the throttler allows it.
    fn execute<F: FnOnce()>(&self, action: F);
}

impl CommandThrottler for Throttler {
    #[inline]
    fn execute<F: FnOnce()>(&self, action: F) {
        Throttler::execute(self, action)
    }
}

impl<T: CommandThrottler> CommandThrottler for &T {
    #[inline]
    fn execute<F: FnOnce()>(&self, action: F) {
        (**self).execute(action)
    }
}

impl<T: CommandThrottler> CommandThrottler for Arc<T> {
    #[inline]
    fn execute<F: FnOnce()>(&self, action: F) {
        (**self).execute(action)
    }
}

/// A [`CommandThrottler`] that runs every action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unthrottled;

impl CommandThrottler for Unthrottled {
    #[inline]
    fn execute<F: FnOnce()>(&self, action: F) {
        action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn block(limit: u64, interval_ms: u64) -> Throttler {
        Throttler::with_config(
            ThrottlerConfig::new(limit)
                .with_interval_ms(interval_ms)
                .with_behavior(LimitingBehavior::Block),
        )
        .unwrap()
    }

    #[test]
    fn test_drop_after_limit() {
        let throttler = Throttler::new(3).unwrap();
        let mut runs = 0;

        for _ in 0..10 {
            throttler.execute(|| runs += 1);
        }

        assert_eq!(runs, 3);
        assert_eq!(throttler.remaining_tokens(), 0);
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert_eq!(Throttler::new(0).unwrap_err(), ConfigError::ZeroLimit);
        assert_eq!(
            Throttler::with_config(ThrottlerConfig::new(1).with_interval(Duration::ZERO))
                .unwrap_err(),
            ConfigError::ZeroInterval
        );
    }

    #[test]
    fn test_default_behavior_is_drop() {
        let throttler = Throttler::new(1).unwrap();
        assert_eq!(throttler.behavior(), LimitingBehavior::Drop);
        assert_eq!(throttler.interval(), Duration::from_secs(60));
        assert_eq!(throttler.try_execute(|| {}), Outcome::Executed);
        assert_eq!(throttler.try_execute(|| {}), Outcome::Dropped);
    }

    #[test]
    fn test_limit_one_grants_one_per_window() {
        let throttler =
            Throttler::with_config(ThrottlerConfig::new(1).with_interval_ms(50)).unwrap();

        assert!(throttler.try_execute(|| {}).is_executed());
        assert!(!throttler.try_execute(|| {}).is_executed());

        thread::sleep(Duration::from_millis(60));

        assert!(throttler.try_execute(|| {}).is_executed());
        assert!(!throttler.try_execute(|| {}).is_executed());
    }

    #[test]
    fn test_refill_after_idle_windows() {
        let throttler =
            Throttler::with_config(ThrottlerConfig::new(10).with_interval_ms(200)).unwrap();

        for _ in 0..4 {
            throttler.execute(|| {});
        }
        assert_eq!(throttler.remaining_tokens(), 6);

        // Several windows pass without calls
        thread::sleep(Duration::from_millis(650));

        assert_eq!(throttler.try_execute(|| {}), Outcome::Executed);
        assert_eq!(throttler.remaining_tokens(), 9);
    }

    #[test]
    fn test_block_waits_for_next_window() {
        let start = Instant::now();
        let throttler = block(2, 50);
        let mut runs = 0;

        for _ in 0..4 {
            throttler.execute(|| runs += 1);
        }

        assert_eq!(runs, 4);
        assert!(start.elapsed() >= Duration::from_millis(50));

        let metrics = throttler.metrics();
        assert_eq!(metrics.total_executed, 4);
        assert_eq!(metrics.total_dropped, 0);
        assert!(metrics.total_waits >= 1);
        assert!(metrics.total_refills >= 1);
        assert!(metrics.max_wait_ns > 0);
    }

    #[test]
    fn test_block_spaces_windows_apart() {
        let start = Instant::now();
        let throttler = Arc::new(block(1, 40));
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let throttler = throttler.clone();
                let stamps = stamps.clone();
                thread::spawn(move || {
                    throttler.execute(|| stamps.lock().unwrap().push(Instant::now()));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut stamps = stamps.lock().unwrap().clone();
        stamps.sort();
        assert_eq!(stamps.len(), 3);
        for (k, stamp) in stamps.iter().enumerate() {
            assert!(stamp.duration_since(start) >= Duration::from_millis(40 * k as u64));
        }
    }

    #[test]
    fn test_cancel_blocked_caller() {
        let throttler = Arc::new(block(1, 60_000));
        let cancel = CancellationToken::new();
        throttler.execute(|| {});

        let ran = Arc::new(AtomicUsize::new(0));
        let handle = {
            let throttler = throttler.clone();
            let cancel = cancel.clone();
            let ran = ran.clone();
            thread::spawn(move || {
                throttler.execute_cancellable(
                    || {
                        ran.fetch_add(1, Ordering::SeqCst);
                    },
                    &cancel,
                )
            })
        };

        thread::sleep(Duration::from_millis(20));
        cancel.cancel();

        assert_eq!(handle.join().unwrap(), Outcome::Cancelled);
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        let metrics = throttler.metrics();
        assert_eq!(metrics.total_cancelled, 1);
        assert_eq!(metrics.total_executed, 1);
    }

    #[test]
    fn test_cancelled_token_still_gets_available_token() {
        let throttler = block(1, 60_000);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(throttler.execute_cancellable(|| {}, &cancel), Outcome::Executed);
        assert_eq!(throttler.execute_cancellable(|| {}, &cancel), Outcome::Cancelled);
    }

    #[test]
    fn test_cancellable_drop_never_waits() {
        let throttler = Throttler::new(1).unwrap();
        let cancel = CancellationToken::new();

        assert_eq!(throttler.execute_cancellable(|| {}, &cancel), Outcome::Executed);
        assert_eq!(throttler.execute_cancellable(|| {}, &cancel), Outcome::Dropped);
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(Outcome::Executed.into_result(), Ok(true));
        assert_eq!(Outcome::Dropped.into_result(), Ok(false));
        assert_eq!(Outcome::Cancelled.into_result(), Err(Cancelled));
    }

    #[test]
    fn test_panicking_action_keeps_token_spent() {
        let throttler = Throttler::new(2).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            throttler.execute(|| panic!("action failed"));
        }));

        assert!(result.is_err());
        assert_eq!(throttler.remaining_tokens(), 1);
    }

    #[test]
    fn test_no_over_grant_under_contention() {
        let throttler = Arc::new(Throttler::new(50).unwrap());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let throttler = throttler.clone();
                let runs = runs.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        throttler.execute(|| {
                            runs.fetch_add(1, Ordering::Relaxed);
                        });
                        assert!(throttler.remaining_tokens() <= 50);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(runs.load(Ordering::Relaxed), 50);
        assert_eq!(throttler.metrics().total_dropped, 16 * 100 - 50);
    }

    #[test]
    fn test_reset() {
        let throttler = Throttler::new(3).unwrap();
        for _ in 0..5 {
            throttler.execute(|| {});
        }

        throttler.reset();

        assert_eq!(throttler.remaining_tokens(), 3);
        let metrics = throttler.metrics();
        assert_eq!(metrics.total_executed, 0);
        assert_eq!(metrics.total_dropped, 0);
    }

    #[test]
    fn test_is_idle() {
        let throttler = Throttler::new(3).unwrap();
        assert!(!throttler.is_idle(Duration::from_secs(10)));

        thread::sleep(Duration::from_millis(30));
        assert!(throttler.is_idle(Duration::from_millis(20)));

        throttler.execute(|| {});
        assert!(!throttler.is_idle(Duration::from_millis(20)));
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let throttler =
            Throttler::with_config(ThrottlerConfig::new(1).with_interval(Duration::MAX)).unwrap();
        assert!(throttler.try_execute(|| {}).is_executed());
        assert_eq!(throttler.try_execute(|| {}), Outcome::Dropped);
    }

    #[test]
    fn test_deadline_saturates() {
        let now = Instant::now();
        assert_eq!(deadline(now, Duration::from_secs(5)), now + Duration::from_secs(5));

        let end = deadline(now, Duration::MAX);
        assert!(end > now + Duration::from_secs(100 * 365 * 24 * 60 * 60));
        assert!(end.checked_add(Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_huge_interval_keeps_limiting() {
        let throttler =
            Throttler::with_config(ThrottlerConfig::new(2).with_interval(Duration::MAX)).unwrap();
        let mut runs = 0;
        for _ in 0..10 {
            throttler.execute(|| runs += 1);
        }
        assert_eq!(runs, 2);
        assert_eq!(throttler.metrics().total_refills, 0);
    }

    #[test]
    fn test_expired_and_idle_waits_for_window_end() {
        let throttler =
            Throttler::with_config(ThrottlerConfig::new(1).with_interval_ms(100)).unwrap();
        throttler.execute(|| {});

        thread::sleep(Duration::from_millis(30));
        assert!(throttler.is_idle(Duration::from_millis(20)));
        assert!(!throttler.is_expired_and_idle(Duration::from_millis(20)));

        thread::sleep(Duration::from_millis(100));
        assert!(throttler.is_expired_and_idle(Duration::from_millis(20)));
    }

    #[test]
    fn test_command_throttler_impls() {
        fn run_three<T: CommandThrottler>(throttler: T) -> usize {
            let mut runs = 0;
            for _ in 0..3 {
                throttler.execute(|| runs += 1);
            }
            runs
        }

        assert_eq!(run_three(Unthrottled), 3);
        assert_eq!(run_three(&Throttler::new(2).unwrap()), 2);
        assert_eq!(run_three(Arc::new(Throttler::new(1).unwrap())), 1);
    }

    #[test]
    fn test_debug_impl() {
        let throttler = Throttler::new(7).unwrap();
        let debug = format!("{:?}", throttler);
        assert!(debug.contains("Throttler"));
        assert!(debug.contains("limit: 7"));
        assert!(debug.contains("Drop"));
    }
}

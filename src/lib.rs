//! # Throttler - Windowed Command Throttling for Rust
//!
//! A small, thread-safe guard that limits how many times a unit of work may
//! run within a time window. Share one [`Throttler`] between every caller that
//! must count against the same limit; each call to
//! [`execute`](Throttler::execute) either runs its closure or doesn't.
//!
//! ## The Windowed Token Bucket
//!
//! ```text
//!     limit = 5, interval = 1s
//!
//!     Time 0.0:  [🪙🪙🪙🪙🪙]  bucket starts full
//!     Call 1-5:  [          ]  ✅ ✅ ✅ ✅ ✅
//!     Call 6:    [          ]  ❌ dropped  (or ⏳ blocks until 1.0)
//!     Time 1.0:  [🪙🪙🪙🪙🪙]  window expired, bucket refilled on next call
//! ```
//!
//! Refill is lazy: nothing happens in the background, the bucket is refilled
//! by the first call that finds its window expired. A window never carries
//! tokens over; at most `limit` actions run per window.
//!
//! ## Overflow Behavior
//!
//! - [`LimitingBehavior::Drop`] (default) - calls made after the tokens are
//!   spent return immediately without running their action.
//! - [`LimitingBehavior::Block`] - the calling thread sleeps until the window
//!   expires, then takes a token from the refilled bucket. Use
//!   [`execute_cancellable`](Throttler::execute_cancellable) with a
//!   [`CancellationToken`] to be able to abort the wait.
//!
//! ## Quick Start
//!
//! ```rust
//! use throttler::Throttler;
//!
//! // At most 100 executions per minute
//! let throttler = Throttler::new(100)?;
//!
//! throttler.execute(|| {
//!     println!("sending report");
//! });
//! # Ok::<(), throttler::ConfigError>(())
//! ```
//!
//! ### Blocking Until the Next Window
//!
//! ```rust
//! use std::time::Instant;
//! use throttler::{LimitingBehavior, ThrottlerBuilder};
//!
//! let started = Instant::now();
//! let throttler = ThrottlerBuilder::new()
//!     .limit(10)
//!     .interval_ms(50)
//!     .behavior(LimitingBehavior::Block)
//!     .build()?;
//!
//! let mut runs = 0;
//! for _ in 0..20 {
//!     throttler.execute(|| runs += 1);
//! }
//!
//! assert_eq!(runs, 20);
//! assert!(started.elapsed().as_millis() >= 50);
//! # Ok::<(), throttler::ConfigError>(())
//! ```
//!
//! ### One Limit per Key
//!
//! ```rust
//! use throttler::{ThrottlerConfig, ThrottlerRegistry};
//!
//! let registry = ThrottlerRegistry::new(ThrottlerConfig::per_second(3))?;
//! registry.execute("billing-api", || { /* call billing */ });
//! registry.execute("search-api", || { /* call search */ });
//! assert_eq!(registry.len(), 2);
//! # Ok::<(), throttler::ConfigError>(())
//! ```
//!
//! ## Thread Safety
//!
//! The token count and the window deadline are updated together under one
//! lock. The lock is never held while a caller sleeps or while an action
//! runs, so a slow action or a blocked caller never stalls the others.
//! There is no fairness among blocked callers: whoever re-checks first after
//! a refill wins the token.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod throttler;

pub use crate::throttler::{
    CancellationToken, Cancelled, CommandThrottler, ConfigError, LimitingBehavior, Outcome,
    RegistryStats, Throttler, ThrottlerConfig, ThrottlerMetrics, ThrottlerRegistry, Unthrottled,
    DEFAULT_INTERVAL, DEFAULT_MAX_KEYS,
};

use std::time::Duration;

/// A throttler wrapped in `Arc` for sharing across threads.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use throttler::{SharedThrottler, Throttler};
///
/// let shared: SharedThrottler = Arc::new(Throttler::new(10).unwrap());
///
/// let worker = shared.clone();
/// std::thread::spawn(move || {
///     worker.execute(|| {});
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(shared.remaining_tokens(), 9);
/// ```
pub type SharedThrottler = std::sync::Arc<Throttler>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports.
///
/// ```rust
/// use throttler::prelude::*;
///
/// let throttler = Throttler::new(10).unwrap();
/// assert_eq!(throttler.behavior(), LimitingBehavior::Drop);
/// ```
pub mod prelude {
    pub use crate::{
        CancellationToken, CommandThrottler, ConfigError, LimitingBehavior, Outcome,
        SharedThrottler, Throttler, ThrottlerBuilder, ThrottlerConfig, ThrottlerRegistry,
    };
}

/// Fluent construction of a [`Throttler`].
///
/// The limit has no default: [`build`](Self::build) fails with
/// [`ConfigError::ZeroLimit`] until [`limit`](Self::limit) is set to a
/// positive value. The interval defaults to 60 seconds and the behavior to
/// [`LimitingBehavior::Drop`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use throttler::{ConfigError, LimitingBehavior, ThrottlerBuilder};
///
/// let throttler = ThrottlerBuilder::new()
///     .limit(100)
///     .interval(Duration::from_secs(1))
///     .behavior(LimitingBehavior::Block)
///     .build()
///     .unwrap();
/// assert_eq!(throttler.limit(), 100);
///
/// let result = ThrottlerBuilder::new().build();
/// assert_eq!(result.unwrap_err(), ConfigError::ZeroLimit);
/// ```
#[derive(Debug, Clone)]
pub struct ThrottlerBuilder {
    config: ThrottlerConfig,
}

impl ThrottlerBuilder {
    /// Creates a builder with no limit, a 60 second interval and drop behavior.
    pub fn new() -> Self {
        Self {
            config: ThrottlerConfig::new(0),
        }
    }

    /// Sets the maximum executions per window.
    pub fn limit(mut self, limit: u64) -> Self {
        self.config.limit = limit;
        self
    }

    /// Sets the window length.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Sets the window length in milliseconds.
    pub fn interval_ms(self, ms: u64) -> Self {
        self.interval(Duration::from_millis(ms))
    }

    /// Sets the overflow policy.
    pub fn behavior(mut self, behavior: LimitingBehavior) -> Self {
        self.config.behavior = behavior;
        self
    }

    /// Validates the settings and builds the throttler.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroLimit`] or [`ConfigError::ZeroInterval`].
    pub fn build(self) -> Result<Throttler, ConfigError> {
        Throttler::with_config(self.config)
    }
}

impl Default for ThrottlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

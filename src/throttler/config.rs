//! # Throttler Configuration
//!
//! Settings that decide how a [`Throttler`](crate::Throttler) gates work:
//! how many executions a window allows, how long a window lasts, and what
//! happens to callers once the window is used up.
//!
//! ```text
//!     ┌──────────────────────────────┐
//!     │   limit: 100                 │ ← executions per window
//!     │   interval: 60s              │ ← window length
//!     │   behavior: Drop | Block     │ ← what happens on overflow
//!     └──────────────────────────────┘
//! ```

use super::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Window length used when none is given.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// What a throttler does with a call made after the window's tokens are spent.
///
/// ## Example
///
/// ```rust
/// use throttler::LimitingBehavior;
///
/// let behavior: LimitingBehavior = "block".parse().unwrap();
/// assert_eq!(behavior, LimitingBehavior::Block);
/// assert_eq!(LimitingBehavior::default(), LimitingBehavior::Drop);
/// assert!("queue".parse::<LimitingBehavior>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LimitingBehavior {
    /// Extra calls are discarded without running their action.
    #[default]
    Drop,

    /// The calling thread sleeps until the window expires, then tries again.
    Block,
}

impl LimitingBehavior {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for LimitingBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitingBehavior {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "block" => Ok(Self::Block),
            _ => Err(ConfigError::UnknownBehavior(s.to_string())),
        }
    }
}

/// Configuration for a throttler.
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use throttler::{LimitingBehavior, ThrottlerConfig};
///
/// // 100 executions per minute, extra calls dropped
/// let config = ThrottlerConfig::new(100);
/// assert_eq!(config.interval, Duration::from_secs(60));
///
/// // 10 executions per 50ms, extra callers wait
/// let config = ThrottlerConfig::new(10)
///     .with_interval_ms(50)
///     .with_behavior(LimitingBehavior::Block);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlerConfig {
    /// Maximum executions per window. Must be greater than zero.
    pub limit: u64,

    /// Window length. Must be greater than zero.
    pub interval: Duration,

    /// Overflow policy once `limit` executions happened in the current window.
    pub behavior: LimitingBehavior,
}

impl ThrottlerConfig {
    /// `limit` executions per [`DEFAULT_INTERVAL`], dropping the overflow.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            interval: DEFAULT_INTERVAL,
            behavior: LimitingBehavior::default(),
        }
    }

    /// `limit` executions per second.
    pub fn per_second(limit: u64) -> Self {
        Self::new(limit).with_interval(Duration::from_secs(1))
    }

    /// `limit` executions per minute.
    pub fn per_minute(limit: u64) -> Self {
        Self::new(limit).with_interval(Duration::from_secs(60))
    }

    /// Sets the window length.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the window length in milliseconds.
    pub fn with_interval_ms(self, ms: u64) -> Self {
        self.with_interval(Duration::from_millis(ms))
    }

    /// Sets the overflow policy.
    pub fn with_behavior(mut self, behavior: LimitingBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroLimit`] if `limit` is 0
    /// - [`ConfigError::ZeroInterval`] if `interval` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// Average executions per second this configuration permits.
    pub fn effective_rate_per_second(&self) -> f64 {
        let secs = self.interval.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.limit as f64 / secs
        }
    }
}

//! Snapshot of a throttler's lifetime counters.
//!
//! ```text
//!     Throttler Metrics:
//!     ├─ Executed: 100   Dropped: 900   Cancelled: 0
//!     ├─ Tokens: 0/100   Refills: 3
//!     └─ Waits: 12       Max Wait: 49.812ms
//! ```

use std::fmt;

/// Point-in-time counters for one [`Throttler`](crate::Throttler).
///
/// Counters are read individually, so a snapshot taken while other threads
/// are executing may mix values from slightly different moments.
///
/// ## Example
///
/// ```rust
/// use throttler::Throttler;
///
/// let throttler = Throttler::new(2).unwrap();
/// for _ in 0..3 {
///     throttler.execute(|| {});
/// }
///
/// let metrics = throttler.metrics();
/// assert_eq!(metrics.total_executed, 2);
/// assert_eq!(metrics.total_dropped, 1);
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlerMetrics {
    /// Tokens granted, i.e. actions dispatched.
    pub total_executed: u64,

    /// Calls discarded under drop behavior.
    pub total_dropped: u64,

    /// Blocked calls abandoned because their cancellation token fired.
    pub total_cancelled: u64,

    /// Times the bucket was refilled after its window expired.
    pub total_refills: u64,

    /// Times a caller slept waiting for the window to expire.
    pub total_waits: u64,

    /// Longest single sleep, in nanoseconds.
    pub max_wait_ns: u64,

    /// Tokens left in the current window.
    pub remaining_tokens: u64,

    /// Executions allowed per window.
    pub limit: u64,
}

impl ThrottlerMetrics {
    /// Executed plus dropped plus cancelled calls.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_executed + self.total_dropped + self.total_cancelled
    }

    /// Fraction of calls whose action ran. `1.0` before any call.
    #[inline]
    pub fn execution_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            1.0
        } else {
            self.total_executed as f64 / total as f64
        }
    }

    /// Fraction of calls that were dropped.
    #[inline]
    pub fn drop_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.total_dropped as f64 / total as f64
        }
    }

    /// Share of the current window's tokens already spent, 0.0 to 1.0.
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            1.0 - (self.remaining_tokens as f64 / self.limit as f64)
        }
    }

    /// No tokens left in the current window.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_tokens == 0
    }

    /// Longest single sleep, in milliseconds.
    #[inline]
    pub fn max_wait_ms(&self) -> f64 {
        self.max_wait_ns as f64 / 1_000_000.0
    }

    /// Human-readable multi-line report.
    pub fn summary(&self) -> String {
        format!(
            "Throttler Metrics:\n\
             ├─ Calls:\n\
             │  ├─ Executed: {}\n\
             │  ├─ Dropped: {}\n\
             │  ├─ Cancelled: {}\n\
             │  └─ Execution Rate: {:.2}%\n\
             ├─ Window:\n\
             │  ├─ Remaining Tokens: {}/{}\n\
             │  ├─ Utilization: {:.2}%\n\
             │  └─ Refills: {}\n\
             └─ Blocking:\n\
                ├─ Waits: {}\n\
                └─ Max Wait: {:.3}ms",
            self.total_executed,
            self.total_dropped,
            self.total_cancelled,
            self.execution_rate() * 100.0,
            self.remaining_tokens,
            self.limit,
            self.utilization() * 100.0,
            self.total_refills,
            self.total_waits,
            self.max_wait_ms(),
        )
    }
}

impl fmt::Display for ThrottlerMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

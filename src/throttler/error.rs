//! Error types for throttler construction and cancelled waits.

/// Invalid throttler configuration.
///
/// Returned from construction and from parsing a [`LimitingBehavior`] out of
/// text. These are programming or deployment errors and are never retried.
///
/// [`LimitingBehavior`]: crate::LimitingBehavior
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The execution limit was zero.
    #[error("execution limit must be greater than 0")]
    ZeroLimit,

    /// The throttling interval was zero.
    #[error("throttling interval must be greater than 0")]
    ZeroInterval,

    /// A limiting behavior name that is neither `drop` nor `block`.
    #[error("unknown limiting behavior: {0:?} (expected \"drop\" or \"block\")")]
    UnknownBehavior(String),
}

/// A blocked caller gave up waiting because its cancellation token fired.
///
/// Distinct from a dropped call: the caller was told to stop waiting, its turn
/// did not simply fail to come.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("throttled execution cancelled while waiting for the next window")]
pub struct Cancelled;

//! # Throttler Module
//!
//! ```text
//!     throttler/
//!     ├── mod.rs          (module organization)
//!     ├── config.rs       (limit, interval, overflow behavior)
//!     ├── core.rs         (windowed token bucket and execute loop)
//!     ├── cancel.rs       (cooperative cancellation of blocked waits)
//!     ├── error.rs        (configuration and cancellation errors)
//!     ├── metrics.rs      (counter snapshots)
//!     └── registry.rs     (one throttler per key)
//! ```

mod cancel;
mod config;
mod core;
mod error;
mod metrics;
mod registry;

pub use cancel::CancellationToken;

pub use config::{LimitingBehavior, ThrottlerConfig, DEFAULT_INTERVAL};

pub use self::core::{CommandThrottler, Outcome, Throttler, Unthrottled};

pub use error::{Cancelled, ConfigError};

pub use metrics::ThrottlerMetrics;

pub use registry::{RegistryStats, ThrottlerRegistry, DEFAULT_MAX_KEYS};

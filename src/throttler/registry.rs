//! # Keyed Throttler Registry
//!
//! One [`Throttler`] per key, all built from the same configuration. Useful
//! when several commands must each be limited independently, e.g. one limit
//! per remote endpoint or per notification channel.
//!
//! ```text
//!     "email"   ──┐
//!     "sms"     ──┼──► Registry ──► DashMap<K, Arc<Throttler>>
//!     "webhook" ──┘         │
//!                           ▼
//!                  idle sweeper (optional thread)
//! ```
//!
//! Throttlers are created lazily on first use and removed by
//! [`cleanup`](ThrottlerRegistry::cleanup) once idle and past the end of
//! their window, so eviction never hands a key a second bucket within one
//! window. The number of tracked keys is bounded; calls for new keys beyond
//! the bound are dropped.

use super::{
    cancel::CancellationToken,
    config::ThrottlerConfig,
    core::{Outcome, Throttler},
    error::ConfigError,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on tracked keys.
pub const DEFAULT_MAX_KEYS: usize = 10_000;

/// Throttlers keyed by `K`, sharing one configuration template.
///
/// ## Example
///
/// ```rust
/// use throttler::{ThrottlerConfig, ThrottlerRegistry};
///
/// let registry = ThrottlerRegistry::new(ThrottlerConfig::per_minute(2)).unwrap();
/// let mut sent = Vec::new();
///
/// for channel in ["email", "email", "email", "sms"] {
///     registry.execute(channel, || sent.push(channel));
/// }
///
/// assert_eq!(sent, ["email", "email", "sms"]);
/// assert_eq!(registry.len(), 2);
/// ```
pub struct ThrottlerRegistry<K>
where
    K: Eq + Hash,
{
    throttlers: DashMap<K, Arc<Throttler>, ahash::RandomState>,
    config: ThrottlerConfig,
    max_keys: usize,
    /// Claimed key slots; never exceeds `max_keys`.
    slots: AtomicUsize,
    total_created: AtomicU64,
    total_removed: AtomicU64,
}

impl<K> ThrottlerRegistry<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Creates a registry bounded to [`DEFAULT_MAX_KEYS`] keys.
    ///
    /// # Errors
    ///
    /// Any error from [`ThrottlerConfig::validate`]; the template is checked
    /// once here so that creating throttlers later cannot fail.
    pub fn new(config: ThrottlerConfig) -> Result<Self, ConfigError> {
        Self::with_max_keys(config, DEFAULT_MAX_KEYS)
    }

    /// Creates a registry that tracks at most `max_keys` keys.
    pub fn with_max_keys(config: ThrottlerConfig, max_keys: usize) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            throttlers: DashMap::with_hasher(ahash::RandomState::new()),
            config,
            max_keys,
            slots: AtomicUsize::new(0),
            total_created: AtomicU64::new(0),
            total_removed: AtomicU64::new(0),
        })
    }

    /// The template every throttler in this registry is built from.
    pub fn config(&self) -> &ThrottlerConfig {
        &self.config
    }

    /// Returns the throttler for `key`, creating it on first use.
    ///
    /// Returns `None` if `key` is new and the registry already tracks
    /// `max_keys` keys.
    pub fn get(&self, key: &K) -> Option<Arc<Throttler>> {
        if let Some(throttler) = self.throttlers.get(key) {
            return Some(throttler.clone());
        }

        match self.throttlers.entry(key.clone()) {
            Entry::Occupied(occupied) => Some(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                if !self.claim_slot() {
                    warn!("Throttler registry full ({} keys), rejecting {:?}", self.max_keys, key);
                    return None;
                }

                let throttler = Arc::new(Throttler::from_validated(&self.config));
                vacant.insert(throttler.clone());

                let created = self.total_created.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Created throttler for {:?} (total created: {})", key, created);

                Some(throttler)
            }
        }
    }

    fn claim_slot(&self) -> bool {
        self.slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.max_keys).then_some(used + 1)
            })
            .is_ok()
    }

    fn release_slots(&self, count: usize) {
        if count > 0 {
            self.slots.fetch_sub(count, Ordering::AcqRel);
            self.total_removed.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Runs `action` through the throttler for `key`.
    ///
    /// Reports [`Outcome::Dropped`] if the registry is full.
    pub fn execute<F: FnOnce()>(&self, key: K, action: F) -> Outcome {
        match self.get(&key) {
            Some(throttler) => throttler.try_execute(action),
            None => Outcome::Dropped,
        }
    }

    /// Cancellable variant of [`execute`](Self::execute).
    pub fn execute_cancellable<F: FnOnce()>(
        &self,
        key: K,
        action: F,
        cancel: &CancellationToken,
    ) -> Outcome {
        match self.get(&key) {
            Some(throttler) => throttler.execute_cancellable(action, cancel),
            None => Outcome::Dropped,
        }
    }

    /// Stops tracking `key`. Callers still holding its `Arc` keep using it.
    pub fn remove(&self, key: &K) -> Option<Arc<Throttler>> {
        let removed = self.throttlers.remove(key).map(|(_, throttler)| throttler);
        if removed.is_some() {
            self.release_slots(1);
        }
        removed
    }

    /// Removes throttlers that have not been used for at least `idle`.
    ///
    /// A throttler whose window is still running, or that a caller still
    /// holds (e.g. one blocked waiting for the next window), is kept even
    /// when idle. Returns the number removed.
    pub fn cleanup(&self, idle: Duration) -> usize {
        let mut removed = 0;

        self.throttlers.retain(|key, throttler| {
            if Arc::strong_count(throttler) == 1 && throttler.is_expired_and_idle(idle) {
                debug!("Removing idle throttler for {:?}", key);
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.release_slots(removed);
            debug!("Cleanup removed {} idle throttlers", removed);
        }
        removed
    }

    /// Removes every throttler.
    pub fn clear(&self) {
        let mut count = 0;
        self.throttlers.retain(|_, _| {
            count += 1;
            false
        });
        self.release_slots(count);
        info!("Cleared all {} throttlers", count);
    }

    /// Number of tracked keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.throttlers.len()
    }

    /// `true` if no key is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.throttlers.is_empty()
    }

    /// Registry-wide counters.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            active_keys: self.len(),
            max_keys: self.max_keys,
            total_created: self.total_created.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
        }
    }
}

impl<K> ThrottlerRegistry<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Spawns a thread that calls [`cleanup`](Self::cleanup) every `every`,
    /// removing throttlers idle for at least `idle`.
    ///
    /// The thread stops when `()` is sent on the returned sender or the
    /// sender is dropped.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use throttler::{ThrottlerConfig, ThrottlerRegistry};
    ///
    /// let registry = Arc::new(ThrottlerRegistry::<String>::new(ThrottlerConfig::per_second(5)).unwrap());
    /// let (handle, stop) = registry
    ///     .clone()
    ///     .start_cleanup_thread(Duration::from_secs(30), Duration::from_secs(300))
    ///     .unwrap();
    ///
    /// stop.send(()).unwrap();
    /// handle.join().unwrap();
    /// ```
    pub fn start_cleanup_thread(
        self: Arc<Self>,
        every: Duration,
        idle: Duration,
    ) -> io::Result<(thread::JoinHandle<()>, mpsc::Sender<()>)> {
        let (stop_tx, stop_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("throttler-cleanup".to_string())
            .spawn(move || {
                info!("Started throttler cleanup thread (every: {:?}, idle: {:?})", every, idle);

                loop {
                    match stop_rx.recv_timeout(every) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            info!("Throttler cleanup thread stopping");
                            break;
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            self.cleanup(idle);

                            let stats = self.stats();
                            if stats.is_near_capacity() {
                                warn!(
                                    "Throttler registry near capacity: {}/{} keys",
                                    stats.active_keys, stats.max_keys
                                );
                            }
                        }
                    }
                }
            })?;

        Ok((handle, stop_tx))
    }
}

impl<K> fmt::Debug for ThrottlerRegistry<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottlerRegistry")
            .field("active_keys", &self.throttlers.len())
            .field("max_keys", &self.max_keys)
            .field("config", &self.config)
            .finish()
    }
}

/// Counters for a [`ThrottlerRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Keys currently tracked.
    pub active_keys: usize,

    /// Maximum keys the registry will track.
    pub max_keys: usize,

    /// Throttlers created since the registry was built.
    pub total_created: u64,

    /// Throttlers removed by cleanup, `remove` or `clear`.
    pub total_removed: u64,
}

impl RegistryStats {
    /// Share of the key bound in use, 0.0 to 1.0.
    pub fn capacity_used(&self) -> f64 {
        if self.max_keys == 0 {
            1.0
        } else {
            self.active_keys as f64 / self.max_keys as f64
        }
    }

    /// More than 80% of the key bound is in use.
    pub fn is_near_capacity(&self) -> bool {
        self.capacity_used() > 0.8
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Throttler Registry Stats:\n\
             ├─ Active Keys: {}/{} ({:.2}%)\n\
             ├─ Total Created: {}\n\
             └─ Total Removed: {}",
            self.active_keys,
            self.max_keys,
            self.capacity_used() * 100.0,
            self.total_created,
            self.total_removed,
        )
    }
}

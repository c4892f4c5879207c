//! Configuration for lockpool.
//!
//! Two kinds of settings live here:
//! - The process-wide page size, fixed in production but overridable by
//!   test harnesses that want tiny pages.
//! - [`BufferPoolConfig`], the per-pool settings fixed at construction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so one page is one I/O.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages a buffer pool caches.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Default lower bound of the randomized lock wait.
pub const DEFAULT_LOCK_TIMEOUT_MIN: Duration = Duration::from_millis(1000);

/// Default upper bound of the randomized lock wait.
pub const DEFAULT_LOCK_TIMEOUT_MAX: Duration = Duration::from_millis(3000);

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Current page size in bytes.
#[inline]
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Override the page size.
///
/// Only meant for test harnesses. Page sources capture the size when they
/// are created, so change it before opening any table.
///
/// # Panics
/// Panics if `size` is 0.
pub fn set_page_size(size: usize) {
    assert!(size > 0, "page size must be > 0");
    PAGE_SIZE.store(size, Ordering::Relaxed);
}

/// Restore the page size to [`DEFAULT_PAGE_SIZE`].
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}

/// Settings for a [`BufferPool`](crate::buffer::BufferPool).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lockpool::BufferPoolConfig;
///
/// let config = BufferPoolConfig::new(16)
///     .with_lock_timeout(Duration::from_millis(50), Duration::from_millis(100))
///     .with_seed(7);
/// assert_eq!(config.num_pages, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of pages held in the cache.
    pub num_pages: usize,

    /// Shortest time a `get_page` call waits for a lock.
    pub lock_timeout_min: Duration,

    /// Longest time a `get_page` call waits for a lock.
    pub lock_timeout_max: Duration,

    /// Seed for the timeout draw. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl BufferPoolConfig {
    /// Default settings with a specific capacity.
    pub fn new(num_pages: usize) -> Self {
        Self {
            num_pages,
            ..Self::default()
        }
    }

    /// Set the range each lock wait is drawn from.
    ///
    /// Passing `min == max` makes every wait exactly that long.
    pub fn with_lock_timeout(mut self, min: Duration, max: Duration) -> Self {
        self.lock_timeout_min = min;
        self.lock_timeout_max = max;
        self
    }

    /// Make the timeout draw reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_pages: DEFAULT_POOL_PAGES,
            lock_timeout_min: DEFAULT_LOCK_TIMEOUT_MIN,
            lock_timeout_max: DEFAULT_LOCK_TIMEOUT_MAX,
            seed: None,
        }
    }
}

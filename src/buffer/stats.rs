//! Counters describing what the buffer pool has been doing.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals kept by a [`BufferPool`](super::BufferPool).
///
/// Counters are bumped with `Ordering::Relaxed`; a [`StatsSnapshot`] taken
/// while other threads run may mix values from slightly different moments.
///
/// # Example
/// ```
/// use lockpool::BufferPoolStats;
///
/// let stats = BufferPoolStats::new();
/// stats.record_hit();
/// stats.record_miss();
/// assert_eq!(stats.snapshot().hit_rate(), 0.5);
/// ```
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    rollbacks: AtomicU64,
    lock_timeouts: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get_page` found the page cached.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// `get_page` had to go to the page source.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// `pages` dirty pages were restored from their before-image.
    pub fn record_rollback(&self, pages: u64) {
        self.rollbacks.fetch_add(pages, Ordering::Relaxed);
    }

    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of page requests served from the cache.
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Copy out the current totals.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            cache_hits: load(&self.hits),
            cache_misses: load(&self.misses),
            evictions: load(&self.evictions),
            pages_read: load(&self.reads),
            pages_written: load(&self.writes),
            pages_rolled_back: load(&self.rollbacks),
            lock_timeouts: load(&self.lock_timeouts),
        }
    }

    /// Zero every counter and return the totals they held.
    pub fn reset(&self) -> StatsSnapshot {
        let take = |counter: &AtomicU64| counter.swap(0, Ordering::Relaxed);
        StatsSnapshot {
            cache_hits: take(&self.hits),
            cache_misses: take(&self.misses),
            evictions: take(&self.evictions),
            pages_read: take(&self.reads),
            pages_written: take(&self.writes),
            pages_rolled_back: take(&self.rollbacks),
            lock_timeouts: take(&self.lock_timeouts),
        }
    }
}

/// Plain copy of [`BufferPoolStats`] at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_rolled_back: u64,
    pub lock_timeouts: u64,
}

impl StatsSnapshot {
    /// Hits over all requests; 0.0 before the first request.
    pub fn hit_rate(&self) -> f64 {
        match self.cache_hits + self.cache_misses {
            0 => 0.0,
            requests => self.cache_hits as f64 / requests as f64,
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} ({:.1}% hit) evicted={} read={} written={} rolled_back={} lock_timeouts={}",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.pages_read,
            self.pages_written,
            self.pages_rolled_back,
            self.lock_timeouts,
        )
    }
}

//! Buffer Pool - the no-steal page cache and transaction boundary.
//!
//! The [`BufferPool`] provides:
//! - Page caching between page sources and memory, bounded by capacity
//! - Page locking under strict two-phase locking
//! - Commit by flushing a transaction's dirty pages
//! - Abort by restoring before-images, with nothing written back

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::buffer::{BufferPoolStats, Frame, PageRef};
use crate::common::{
    BufferPoolConfig, Error, PageId, Permission, Result, TableId, TransactionId,
};
use crate::concurrency::{LockManager, TimeoutPolicy, TransactionRegistry};
use crate::storage::{Catalog, Record};

/// Caches pages and coordinates the transactions that use them.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         BufferPool                          │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │   frames: Arc<Frame> per PageId   │   │
/// │  │PageId → Frame│─▶│  [Frame] [Frame] ... (≤ capacity) │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │ lock_manager │  │   catalog    │  │ transactions │      │
/// │  │ 2PL, condvar │  │TableId → src │  │ start times  │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock`. Hits take the read side; the
///   check-capacity/evict/insert sequence and dirty installs take the write
///   side as one critical section.
/// - `lock_manager`: internal `Mutex` + `Condvar`
/// - `stats`: atomic counters, no lock
///
/// # No-steal
/// A dirty page is never evicted. When every cached page is dirty, loading
/// another page fails with [`Error::CacheExhausted`] rather than writing
/// uncommitted data back.
///
/// # Usage
/// ```ignore
/// let pool = BufferPool::new(10);
/// pool.catalog().add_table(Arc::new(heap_file));
///
/// let tid = TransactionId::new();
/// let frame = pool.get_page(tid, pid, Permission::ReadOnly)?;
/// let first = frame.read().as_slice()[0];
/// pool.transaction_complete(tid)?;
/// ```
pub struct BufferPool {
    /// Maps page IDs to their single cached frame.
    page_table: RwLock<HashMap<PageId, PageRef>>,

    /// Maximum number of cached pages (immutable after construction).
    capacity: usize,

    /// Page sources by table.
    catalog: Catalog,

    lock_manager: LockManager,

    transactions: TransactionRegistry,

    /// Draws the lock wait window of each `get_page` call.
    timeouts: TimeoutPolicy,

    /// Performance statistics.
    stats: BufferPoolStats,
}

impl BufferPool {
    /// Create a buffer pool caching up to `num_pages` pages, with default
    /// lock timeouts.
    ///
    /// # Panics
    /// Panics if `num_pages` is 0.
    pub fn new(num_pages: usize) -> Self {
        Self::with_config(BufferPoolConfig::new(num_pages))
    }

    /// Create a buffer pool from a full configuration.
    ///
    /// # Panics
    /// Panics if `config.num_pages` is 0.
    pub fn with_config(config: BufferPoolConfig) -> Self {
        assert!(config.num_pages > 0, "num_pages must be > 0");

        Self {
            page_table: RwLock::new(HashMap::new()),
            capacity: config.num_pages,
            catalog: Catalog::new(),
            lock_manager: LockManager::new(),
            transactions: TransactionRegistry::new(),
            timeouts: TimeoutPolicy::new(
                config.lock_timeout_min,
                config.lock_timeout_max,
                config.seed,
            ),
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page on behalf of `tid` with permission `perm`.
    ///
    /// Waits for the page lock up to a window drawn from the configured
    /// timeout range. Returns the cached frame, or loads the page from its
    /// source (evicting a clean page first if the cache is full).
    ///
    /// On failure no lock taken by this call remains and nothing is cached.
    ///
    /// # Errors
    /// - `Error::LockTimeout` if the lock was not granted in time
    /// - `Error::CacheExhausted` if the cache is full of dirty pages
    /// - `Error::UnknownTable` and storage errors from the page source
    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permission) -> Result<PageRef> {
        self.transactions.begin(tid);

        let timeout = self.timeouts.draw();
        let grant = self
            .lock_manager
            .acquire(tid, pid, perm, timeout)
            .inspect_err(|err| {
                if matches!(err, Error::LockTimeout { .. }) {
                    self.stats.record_lock_timeout();
                }
            })?;

        self.fetch_page(pid).inspect_err(|err| {
            debug!(%tid, %pid, %err, "page fetch failed, reverting lock");
            self.lock_manager.revert(tid, pid, grant);
        })
    }

    /// Release `tid`'s lock on `pid` before the transaction ends.
    ///
    /// This breaks two-phase locking: another transaction may then change
    /// the page while `tid` still depends on what it read. Only safe when
    /// `tid` has not used the page's contents.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    /// Whether `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid)
    }

    // ========================================================================
    // Public API: Records
    // ========================================================================

    /// Insert `record` into `table` on behalf of `tid`.
    ///
    /// The table's source picks the page(s) and sets `record.id`; every page
    /// it changed is marked dirty under `tid` and cached.
    ///
    /// Returns the ids of the dirtied pages.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table: TableId,
        record: &mut Record,
    ) -> Result<Vec<PageId>> {
        let source = self.catalog.source(table)?;
        let frames = source.insert_tuple(self, tid, record)?;
        self.install_dirty(tid, &frames)
    }

    /// Delete the stored `record` on behalf of `tid`.
    ///
    /// The table is taken from the record's page id.
    pub fn delete_tuple(&self, tid: TransactionId, record: &Record) -> Result<Vec<PageId>> {
        let rid = record
            .id
            .ok_or_else(|| Error::InvalidRecord("record has no id".to_string()))?;
        let source = self.catalog.source(rid.page.table)?;
        let frames = source.delete_tuple(self, tid, record)?;
        self.install_dirty(tid, &frames)
    }

    /// Report that `tid` modified `frame`.
    ///
    /// Marks the frame dirty under `tid` and makes it the cached frame for
    /// its page, replacing a stale cached frame. If the page had been
    /// evicted, it is re-inserted (evicting a clean page if needed).
    ///
    /// # Errors
    /// - `Error::LockNotHeld` if `tid` lacks a ReadWrite lock on the page
    /// - `Error::CacheExhausted` if re-insertion needs room and none can be
    ///   made
    pub fn mark_dirty(&self, tid: TransactionId, frame: &PageRef) -> Result<()> {
        let pid = frame.page_id();
        if self.lock_manager.mode(tid, pid) != Some(Permission::ReadWrite) {
            return Err(Error::LockNotHeld { tid, pid });
        }

        let mut table = self.page_table.write();
        match table.get(&pid) {
            Some(cached) if Arc::ptr_eq(cached, frame) => {}
            Some(_) => {
                trace!(%pid, "replacing stale cached frame");
                table.insert(pid, Arc::clone(frame));
            }
            None => {
                if table.len() >= self.capacity {
                    self.evict_locked(&mut table)?;
                }
                table.insert(pid, Arc::clone(frame));
            }
        }
        frame.mark_dirty(tid);
        Ok(())
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Write a cached page to its source if it's dirty.
    ///
    /// Clears the dirty marker and refreshes the before-image. Uncached and
    /// clean pages are left alone.
    ///
    /// # Errors
    /// - I/O errors from the page source
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let frame = match self.page_table.read().get(&pid) {
            Some(frame) => Arc::clone(frame),
            None => return Ok(()),
        };

        self.flush_frame(&frame)
    }

    /// Flush every cached dirty page.
    ///
    /// This writes uncommitted data, so it breaks no-steal. Meant for
    /// shutdown and tests.
    pub fn flush_all_pages(&self) -> Result<()> {
        for frame in self.frames_where(|_| true) {
            self.flush_frame(&frame)?;
        }
        Ok(())
    }

    /// Flush the pages dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for frame in self.frames_where(|frame| frame.dirtied_by() == Some(tid)) {
            self.flush_frame(&frame)?;
        }
        Ok(())
    }

    /// Drop a page from the cache without flushing it.
    ///
    /// Used when a cached copy must not resurface, e.g. after recovery
    /// rewrote the page on disk.
    pub fn discard_page(&self, pid: PageId) {
        if self.page_table.write().remove(&pid).is_some() {
            trace!(%pid, "discarded page");
        }
    }

    /// Evict one clean page, chosen arbitrarily.
    ///
    /// Returns the evicted page id, or `None` if the cache is empty.
    ///
    /// # Errors
    /// - `Error::CacheExhausted` if every cached page is dirty
    pub fn evict_page(&self) -> Result<Option<PageId>> {
        let mut table = self.page_table.write();
        if table.is_empty() {
            return Ok(None);
        }
        self.evict_locked(&mut table).map(Some)
    }

    // ========================================================================
    // Public API: Transaction completion
    // ========================================================================

    /// Commit `tid`.
    pub fn transaction_complete(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete_with(tid, true)
    }

    /// Commit or abort `tid`, then release all its locks.
    ///
    /// - commit: flush every page `tid` dirtied
    /// - abort: restore every page `tid` dirtied to its before-image; nothing
    ///   is written back
    ///
    /// If a commit flush fails, the pages not yet flushed are restored as on
    /// abort. Locks are released either way and the flush error is returned.
    pub fn transaction_complete_with(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let result = if commit {
            // No frame may stay dirty under a finished transaction
            self.flush_pages(tid).inspect_err(|_| {
                self.roll_back(tid);
            })
        } else {
            self.roll_back(tid);
            Ok(())
        };

        self.lock_manager.release_all(tid);
        let active_for = self.transactions.complete(tid);

        match &result {
            Ok(()) => debug!(%tid, commit, ?active_for, "transaction complete"),
            Err(err) => warn!(%tid, %err, "commit flush failed"),
        }
        result
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Page sources of this pool.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn transactions(&self) -> &TransactionRegistry {
        &self.transactions
    }

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Whether `pid` is cached.
    pub fn is_cached(&self, pid: PageId) -> bool {
        self.page_table.read().contains_key(&pid)
    }

    /// The cached frame of `pid`, without taking a page lock.
    ///
    /// For inspection only; reading through it bypasses two-phase locking.
    pub fn cached_page(&self, pid: PageId) -> Option<PageRef> {
        self.page_table.read().get(&pid).cloned()
    }

    /// Number of cached pages with a dirty marker.
    pub fn dirty_count(&self) -> usize {
        self.page_table
            .read()
            .values()
            .filter(|frame| frame.is_dirty())
            .count()
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Return the cached frame for `pid`, loading it on a miss.
    fn fetch_page(&self, pid: PageId) -> Result<PageRef> {
        // Fast path: read lock only
        if let Some(frame) = self.page_table.read().get(&pid) {
            self.stats.record_hit();
            return Ok(Arc::clone(frame));
        }

        self.stats.record_miss();

        // Read outside the cache lock
        let source = self.catalog.source(pid.table)?;
        let page = source.read_page(pid)?;
        self.stats.record_read();

        let mut table = self.page_table.write();

        // Another transaction may have loaded it meanwhile; theirs wins
        if let Some(frame) = table.get(&pid) {
            return Ok(Arc::clone(frame));
        }

        if table.len() >= self.capacity {
            self.evict_locked(&mut table)?;
        }

        let frame = Arc::new(Frame::new(pid, page));
        table.insert(pid, Arc::clone(&frame));
        trace!(%pid, "loaded page");

        Ok(frame)
    }

    // ========================================================================
    // Internal: Eviction, flush, rollback
    // ========================================================================

    /// Remove one clean page from `table`. The caller holds the write lock.
    fn evict_locked(&self, table: &mut HashMap<PageId, PageRef>) -> Result<PageId> {
        let victim = table
            .iter()
            .find(|(_, frame)| !frame.is_dirty())
            .map(|(&pid, _)| pid);

        let Some(victim) = victim else {
            warn!(capacity = self.capacity, "every cached page is dirty");
            return Err(Error::CacheExhausted {
                capacity: self.capacity,
            });
        };

        table.remove(&victim);
        self.stats.record_eviction();
        trace!(pid = %victim, "evicted page");

        Ok(victim)
    }

    /// Flush a frame if dirty.
    ///
    /// The page read guard is held from the dirty check until the marker is
    /// cleared, so no write can land between persisting and clearing.
    fn flush_frame(&self, frame: &PageRef) -> Result<()> {
        let pid = frame.page_id();
        let page = frame.read();
        let Some(tid) = frame.dirtied_by() else {
            return Ok(());
        };

        let source = self.catalog.source(pid.table)?;
        source.write_page(pid, &page)?;
        frame.refresh_before_image(&page);
        frame.clear_dirty();
        drop(page);

        self.stats.record_write();
        trace!(%pid, %tid, "flushed page");

        Ok(())
    }

    /// Restore every page dirtied by `tid`. Returns how many were restored.
    fn roll_back(&self, tid: TransactionId) -> usize {
        let frames = self.frames_where(|frame| frame.dirtied_by() == Some(tid));
        for frame in &frames {
            frame.restore_before_image();
            trace!(pid = %frame.page_id(), %tid, "restored before-image");
        }

        self.stats.record_rollback(frames.len() as u64);
        frames.len()
    }

    /// Mark every frame dirty under `tid` and collect their page ids.
    fn install_dirty(&self, tid: TransactionId, frames: &[PageRef]) -> Result<Vec<PageId>> {
        let mut dirtied = Vec::with_capacity(frames.len());
        for frame in frames {
            self.mark_dirty(tid, frame)?;
            dirtied.push(frame.page_id());
        }
        Ok(dirtied)
    }

    /// Snapshot of cached frames matching `filter`.
    fn frames_where(&self, filter: impl Fn(&Frame) -> bool) -> Vec<PageRef> {
        self.page_table
            .read()
            .values()
            .filter(|frame| filter(frame))
            .cloned()
            .collect()
    }
}

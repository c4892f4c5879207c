//! Page-granularity lock manager for strict two-phase locking.
//!
//! The [`LockManager`] keeps one [`LockState`] per locked page and decides
//! grants with a shared/exclusive compatibility check:
//!
//! ```text
//!                  held: none   held: Shared     held: Exclusive
//! want ReadOnly    grant        join holders     fail (unless own)
//! want ReadWrite   grant        upgrade if sole  fail (unless own)
//!                               holder, else fail
//! ```
//!
//! An upgrade only happens in place when the requester is the only shared
//! holder. With other readers present the request fails; it is never queued
//! behind them, and callers retry through [`LockManager::acquire`].

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use super::lock::{Lock, LockState};
use crate::common::{Error, PageId, Permission, Result, TransactionId};

/// What a successful grant changed.
///
/// Returned by [`LockManager::acquire`] so a caller whose later work fails
/// can undo exactly its own effect with [`LockManager::revert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The transaction already held the page at the requested strength.
    AlreadyHeld,
    /// A new lock was added.
    Acquired,
    /// A sole ReadOnly lock became ReadWrite.
    Upgraded,
}

#[derive(Debug, Default)]
struct LockTable {
    /// Holder state of every locked page. Unlocked pages have no entry.
    pages: HashMap<PageId, LockState>,

    /// Pages each transaction holds, for `release_all`.
    held: HashMap<TransactionId, HashSet<PageId>>,
}

impl LockTable {
    fn try_grant(&mut self, tid: TransactionId, pid: PageId, perm: Permission) -> Option<Grant> {
        let state = self.pages.entry(pid).or_default();
        let held = state.mode_of(tid);

        let grant = match perm {
            Permission::ReadOnly => {
                if held.is_some() {
                    Grant::AlreadyHeld
                } else {
                    match *state {
                        LockState::Unlocked => *state = LockState::Shared(HashSet::from([tid])),
                        LockState::Shared(ref mut holders) => {
                            holders.insert(tid);
                        }
                        LockState::Exclusive(_) => return None,
                    }
                    Grant::Acquired
                }
            }
            Permission::ReadWrite => match held {
                Some(Permission::ReadWrite) => Grant::AlreadyHeld,
                Some(Permission::ReadOnly) if state.holder_count() == 1 => {
                    *state = LockState::Exclusive(tid);
                    Grant::Upgraded
                }
                None if state.is_unlocked() => {
                    *state = LockState::Exclusive(tid);
                    Grant::Acquired
                }
                _ => return None,
            },
        };

        if grant == Grant::Acquired {
            self.held.entry(tid).or_default().insert(pid);
        }
        Some(grant)
    }

    fn release(&mut self, tid: TransactionId, pid: PageId) -> bool {
        let Some(state) = self.pages.get_mut(&pid) else {
            return false;
        };

        let released = match state {
            LockState::Unlocked => false,
            LockState::Shared(holders) => holders.remove(&tid),
            LockState::Exclusive(holder) => *holder == tid,
        };
        if !released {
            return false;
        }

        let now_unlocked = match state {
            LockState::Shared(holders) => holders.is_empty(),
            _ => true,
        };
        if now_unlocked {
            self.pages.remove(&pid);
        }

        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.held.remove(&tid);
            }
        }
        true
    }

    fn downgrade(&mut self, tid: TransactionId, pid: PageId) {
        if let Some(state) = self.pages.get_mut(&pid) {
            if *state == LockState::Exclusive(tid) {
                *state = LockState::Shared(HashSet::from([tid]));
            }
        }
    }
}

/// Grants, upgrades and releases page locks.
///
/// # Thread Safety
/// The whole table sits behind one `Mutex`, so each grant decision is a
/// single critical section. Every release notifies `released`; waiters in
/// [`acquire`](Self::acquire) re-check the table when woken, bounded by their
/// own deadline.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    /// Create an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single non-blocking attempt.
    ///
    /// Returns true iff `tid` now holds `pid` at `perm` or stronger.
    pub fn grant(&self, tid: TransactionId, pid: PageId, perm: Permission) -> bool {
        self.table.lock().try_grant(tid, pid, perm).is_some()
    }

    /// Block until the lock is granted or `timeout` elapses.
    ///
    /// # Errors
    /// - `Error::LockTimeout` if the lock was not granted in time. Nothing
    ///   is granted in that case.
    pub fn acquire(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
        timeout: Duration,
    ) -> Result<Grant> {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut table = self.table.lock();

        loop {
            if let Some(grant) = table.try_grant(tid, pid, perm) {
                trace!(%tid, %pid, ?perm, ?grant, "lock granted");
                return Ok(grant);
            }

            if Instant::now() >= deadline {
                let waited = start.elapsed();
                debug!(%tid, %pid, ?perm, ?waited, "lock wait timed out");
                return Err(Error::LockTimeout { tid, pid, waited });
            }

            trace!(%tid, %pid, ?perm, "waiting for lock");
            self.released.wait_until(&mut table, deadline);
        }
    }

    /// Undo the effect of a grant returned by [`acquire`](Self::acquire).
    pub fn revert(&self, tid: TransactionId, pid: PageId, grant: Grant) {
        let mut table = self.table.lock();
        match grant {
            Grant::AlreadyHeld => return,
            Grant::Acquired => {
                table.release(tid, pid);
            }
            Grant::Upgraded => table.downgrade(tid, pid),
        }
        drop(table);
        self.released.notify_all();
    }

    /// Whether `tid` holds any lock on `pid`.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.mode(tid, pid).is_some()
    }

    /// The permission `tid` holds on `pid`, if any.
    pub fn mode(&self, tid: TransactionId, pid: PageId) -> Option<Permission> {
        self.table
            .lock()
            .pages
            .get(&pid)
            .and_then(|state| state.mode_of(tid))
    }

    /// Current holder state of `pid`.
    pub fn state(&self, pid: PageId) -> LockState {
        self.table
            .lock()
            .pages
            .get(&pid)
            .cloned()
            .unwrap_or_default()
    }

    /// All locks on `pid`.
    pub fn locks_on(&self, pid: PageId) -> Vec<Lock> {
        self.state(pid).locks()
    }

    /// Pages `tid` currently holds a lock on.
    pub fn pages_locked_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Release `tid`'s lock on `pid`. Absent locks are ignored.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let released = self.table.lock().release(tid, pid);
        if released {
            self.released.notify_all();
        }
    }

    /// Release every lock `tid` holds.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tid).unwrap_or_default();
        for &pid in &pages {
            table.release(tid, pid);
        }
        drop(table);

        if !pages.is_empty() {
            trace!(%tid, count = pages.len(), "released all locks");
            self.released.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use std::sync::Arc;
    use std::thread;

    fn tid(n: u64) -> TransactionId {
        TransactionId::from_raw(n)
    }

    fn pid(n: u32) -> PageId {
        PageId::new(TableId(1), n)
    }

    #[test]
    fn test_grant_on_unlocked_page() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadOnly));
        assert!(lm.grant(tid(2), pid(1), Permission::ReadWrite));

        assert_eq!(lm.mode(tid(1), pid(0)), Some(Permission::ReadOnly));
        assert_eq!(lm.mode(tid(2), pid(1)), Some(Permission::ReadWrite));
    }

    #[test]
    fn test_shared_holders_coexist() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadOnly));
        assert!(lm.grant(tid(2), pid(0), Permission::ReadOnly));
        assert!(lm.grant(tid(3), pid(0), Permission::ReadOnly));

        assert_eq!(lm.locks_on(pid(0)).len(), 3);
    }

    #[test]
    fn test_exclusive_blocks_everyone_else() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));

        assert!(!lm.grant(tid(2), pid(0), Permission::ReadOnly));
        assert!(!lm.grant(tid(2), pid(0), Permission::ReadWrite));
        assert_eq!(lm.state(pid(0)), LockState::Exclusive(tid(1)));
    }

    #[test]
    fn test_reentrant_requests() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));
        // ReadWrite covers ReadOnly; no downgrade happens
        assert!(lm.grant(tid(1), pid(0), Permission::ReadOnly));
        assert_eq!(lm.mode(tid(1), pid(0)), Some(Permission::ReadWrite));

        assert!(lm.grant(tid(2), pid(1), Permission::ReadOnly));
        assert!(lm.grant(tid(2), pid(1), Permission::ReadOnly));
        assert_eq!(lm.locks_on(pid(1)).len(), 1);
    }

    #[test]
    fn test_sole_reader_upgrades_in_place() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadOnly));
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));

        assert_eq!(lm.state(pid(0)), LockState::Exclusive(tid(1)));
        assert_eq!(lm.locks_on(pid(0)).len(), 1);
    }

    #[test]
    fn test_upgrade_fails_with_other_readers() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadOnly));
        assert!(lm.grant(tid(2), pid(0), Permission::ReadOnly));

        assert!(!lm.grant(tid(1), pid(0), Permission::ReadWrite));
        // Failed upgrade leaves the shared lock in place
        assert_eq!(lm.mode(tid(1), pid(0)), Some(Permission::ReadOnly));

        lm.release(tid(2), pid(0));
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));
    }

    #[test]
    fn test_release_missing_lock_is_noop() {
        let lm = LockManager::new();
        lm.release(tid(1), pid(0));
        lm.release_all(tid(1));

        assert!(lm.grant(tid(2), pid(0), Permission::ReadWrite));
        lm.release(tid(1), pid(0));
        assert!(lm.holds(tid(2), pid(0)));
    }

    #[test]
    fn test_release_all() {
        let lm = LockManager::new();
        for n in 0..5 {
            assert!(lm.grant(tid(1), pid(n), Permission::ReadWrite));
        }
        assert!(lm.grant(tid(2), pid(9), Permission::ReadOnly));
        assert_eq!(lm.pages_locked_by(tid(1)).len(), 5);

        lm.release_all(tid(1));

        assert!(lm.pages_locked_by(tid(1)).is_empty());
        for n in 0..5 {
            assert!(lm.state(pid(n)).is_unlocked());
        }
        assert!(lm.holds(tid(2), pid(9)));
    }

    #[test]
    fn test_revert_undoes_only_own_effect() {
        let lm = LockManager::new();

        let grant = lm
            .acquire(tid(1), pid(0), Permission::ReadOnly, Duration::ZERO)
            .unwrap();
        assert_eq!(grant, Grant::Acquired);
        lm.revert(tid(1), pid(0), grant);
        assert!(!lm.holds(tid(1), pid(0)));

        lm.grant(tid(1), pid(0), Permission::ReadOnly);
        let grant = lm
            .acquire(tid(1), pid(0), Permission::ReadWrite, Duration::ZERO)
            .unwrap();
        assert_eq!(grant, Grant::Upgraded);
        lm.revert(tid(1), pid(0), grant);
        assert_eq!(lm.mode(tid(1), pid(0)), Some(Permission::ReadOnly));

        let grant = lm
            .acquire(tid(1), pid(0), Permission::ReadOnly, Duration::ZERO)
            .unwrap();
        assert_eq!(grant, Grant::AlreadyHeld);
        lm.revert(tid(1), pid(0), grant);
        assert!(lm.holds(tid(1), pid(0)));
    }

    #[test]
    fn test_acquire_times_out() {
        let lm = LockManager::new();
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));

        let timeout = Duration::from_millis(50);
        let start = Instant::now();
        let result = lm.acquire(tid(2), pid(0), Permission::ReadWrite, timeout);

        assert!(matches!(result, Err(Error::LockTimeout { .. })));
        assert!(start.elapsed() >= timeout);
        assert!(!lm.holds(tid(2), pid(0)));
    }

    #[test]
    fn test_acquire_wakes_on_release() {
        let lm = Arc::new(LockManager::new());
        assert!(lm.grant(tid(1), pid(0), Permission::ReadWrite));

        let waiter = {
            let lm = Arc::clone(&lm);
            thread::spawn(move || {
                lm.acquire(tid(2), pid(0), Permission::ReadWrite, Duration::from_secs(10))
            })
        };

        thread::sleep(Duration::from_millis(20));
        lm.release_all(tid(1));

        let grant = waiter.join().unwrap().unwrap();
        assert_eq!(grant, Grant::Acquired);
        assert_eq!(lm.state(pid(0)), LockState::Exclusive(tid(2)));
    }
}

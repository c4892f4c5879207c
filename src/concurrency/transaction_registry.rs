//! Bookkeeping of active transactions.
//!
//! Purely diagnostic: nothing in lock or cache decisions reads it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::common::TransactionId;

/// Start instants of transactions that have touched a page and not yet
/// completed.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    started: Mutex<HashMap<TransactionId, Instant>>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `tid` as started now, unless it is already registered.
    ///
    /// Returns true if this call registered it.
    pub fn begin(&self, tid: TransactionId) -> bool {
        let mut started = self.started.lock();
        if started.contains_key(&tid) {
            return false;
        }
        started.insert(tid, Instant::now());
        true
    }

    /// Forget `tid`. Returns how long it was active, if it was registered.
    pub fn complete(&self, tid: TransactionId) -> Option<Duration> {
        self.started.lock().remove(&tid).map(|start| start.elapsed())
    }

    pub fn started_at(&self, tid: TransactionId) -> Option<Instant> {
        self.started.lock().get(&tid).copied()
    }

    pub fn is_active(&self, tid: TransactionId) -> bool {
        self.started.lock().contains_key(&tid)
    }

    /// Active transactions, oldest first.
    pub fn active(&self) -> Vec<TransactionId> {
        let started = self.started.lock();
        let mut active: Vec<(TransactionId, Instant)> =
            started.iter().map(|(&tid, &at)| (tid, at)).collect();
        active.sort_by_key(|&(tid, at)| (at, tid));
        active.into_iter().map(|(tid, _)| tid).collect()
    }

    pub fn len(&self) -> usize {
        self.started.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

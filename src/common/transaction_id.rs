//! Transaction identifier and lock permission types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a transaction.
///
/// Created by the caller before its first page access. Ids handed out by
/// [`TransactionId::new`] are unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate a fresh, never-before-used id.
    pub fn new() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id. The caller is responsible for uniqueness.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        TransactionId(raw)
    }

    /// The raw numeric id.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Access level requested for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Shared access. Any number of transactions may hold it together.
    ReadOnly,
    /// Exclusive access. Held by one transaction, alone.
    ReadWrite,
}

impl Permission {
    /// Whether a lock held at `self` satisfies a request for `wanted`.
    #[inline]
    pub fn covers(self, wanted: Permission) -> bool {
        self == Permission::ReadWrite || wanted == Permission::ReadOnly
    }
}

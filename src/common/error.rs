//! Error types for lockpool.

use std::time::Duration;

use thiserror::Error;

use super::{PageId, TableId, TransactionId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in lockpool.
///
/// Every error surfaces synchronously from the call that caused it. Nothing
/// is retried internally; deciding whether to abort is the caller's job
/// (see [`Error::requires_abort`]).
#[derive(Debug, Error)]
pub enum Error {
    /// A lock request was not granted before its wait window closed.
    #[error("{tid} timed out after {waited:?} waiting for a lock on {pid}")]
    LockTimeout {
        tid: TransactionId,
        pid: PageId,
        waited: Duration,
    },

    /// Every cached page is dirty, so nothing can be evicted.
    ///
    /// Under no-steal a dirty page may hold the only copy of uncommitted
    /// changes, so it is never written back to make room.
    #[error("all {capacity} cached pages are dirty, cannot evict")]
    CacheExhausted { capacity: usize },

    /// A page was reported dirty by a transaction without a ReadWrite lock.
    #[error("{tid} does not hold a ReadWrite lock on {pid}")]
    LockNotHeld { tid: TransactionId, pid: PageId },

    /// I/O error from the page source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in its table.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// Stored checksum does not match the page contents.
    #[error("checksum mismatch on {0}")]
    ChecksumMismatch(PageId),

    /// No page source is registered for the table.
    #[error("unknown table {0}")]
    UnknownTable(TableId),

    /// The record cannot be stored or located.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// Whether the transaction that hit this error must be aborted.
    ///
    /// Lock timeouts and cache exhaustion are concurrency outcomes, not
    /// storage failures; the caller is expected to call
    /// `transaction_complete_with(tid, false)` and possibly retry.
    pub fn requires_abort(&self) -> bool {
        matches!(self, Error::LockTimeout { .. } | Error::CacheExhausted { .. })
    }

    /// Whether this error came from persistent storage.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::PageNotFound(_) | Error::ChecksumMismatch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(TableId(1), 42));
        assert_eq!(format!("{}", err), "Page(1/42) not found");

        let err = Error::CacheExhausted { capacity: 2 };
        assert_eq!(format!("{}", err), "all 2 cached pages are dirty, cannot evict");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_storage());
        assert!(!err.requires_abort());
    }

    #[test]
    fn test_requires_abort() {
        let timeout = Error::LockTimeout {
            tid: TransactionId::from_raw(1),
            pid: PageId::new(TableId(0), 0),
            waited: Duration::from_millis(10),
        };
        assert!(timeout.requires_abort());
        assert!(Error::CacheExhausted { capacity: 1 }.requires_abort());
        assert!(!Error::UnknownTable(TableId(9)).requires_abort());
    }
}

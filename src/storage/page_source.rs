//! The page source capability consumed by the buffer pool.

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::storage::page::Page;
use crate::storage::Record;

/// Loads and persists the pages of one table.
///
/// The buffer pool never interprets page bytes; it only moves them between
/// a source and its cache. Record mutations are delegated to the source,
/// which fetches the pages it needs through the pool (taking locks on the
/// way) and returns the frames it changed. The pool then marks those frames
/// dirty and installs them in the cache.
pub trait PageSource: Send + Sync {
    /// Table this source stores.
    fn table_id(&self) -> TableId;

    /// Read a page from storage.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist
    /// - I/O and checksum errors
    fn read_page(&self, pid: PageId) -> Result<Page>;

    /// Persist a page.
    fn write_page(&self, pid: PageId, page: &Page) -> Result<()>;

    /// Number of pages currently stored.
    fn num_pages(&self) -> Result<u32>;

    /// Store `record` on behalf of `tid`, setting its id.
    ///
    /// Returns the frames that were modified.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        record: &mut Record,
    ) -> Result<Vec<PageRef>>;

    /// Remove the stored `record` on behalf of `tid`.
    ///
    /// Returns the frames that were modified.
    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        record: &Record,
    ) -> Result<Vec<PageRef>>;
}

//! Frame - the single cached copy of a page.
//!
//! A [`Frame`] holds a [`Page`] plus the metadata the buffer pool needs for
//! no-steal caching:
//! - Which page it is
//! - Which transaction dirtied it, if any
//! - The before-image used to undo that transaction's writes

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, TransactionId};
use crate::storage::page::Page;

/// A cached page.
///
/// While a page is cached there is exactly one `Frame` for it, and every
/// caller of `get_page` for that id receives a handle ([`PageRef`]) to the
/// same frame. Mutations are visible to all handle holders.
///
/// # Thread Safety
/// - `page`: `RwLock` for read/write synchronization of the bytes. Which
///   transaction may take the write side is decided by page locks, not by
///   this `RwLock`.
/// - `dirtied_by`: `Mutex` for safe updates
/// - `before_image`: `Mutex`, always taken after `page` when both are held
///
/// [`PageRef`]: super::PageRef
#[derive(Debug)]
pub struct Frame {
    page_id: PageId,

    /// The live page data.
    page: RwLock<Page>,

    /// Transaction whose uncommitted writes the page holds.
    dirtied_by: Mutex<Option<TransactionId>>,

    /// Content as of load or last flush.
    before_image: Mutex<Page>,
}

impl Frame {
    /// Wrap a freshly loaded page. The before-image is a copy of it.
    pub fn new(page_id: PageId, page: Page) -> Self {
        let before_image = page.duplicate();
        Self {
            page_id,
            page: RwLock::new(page),
            dirtied_by: Mutex::new(None),
            before_image: Mutex::new(before_image),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    // ========================================================================
    // Page access (RwLock)
    // ========================================================================

    /// Acquire read lock on the page.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write lock on the page.
    ///
    /// Only the holder of a ReadWrite page lock should call this, and it
    /// must report the change with
    /// [`BufferPool::mark_dirty`](super::BufferPool::mark_dirty) so the frame
    /// is protected from eviction.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    // ========================================================================
    // Dirty marker
    // ========================================================================

    /// Transaction that dirtied this page, if any.
    #[inline]
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        *self.dirtied_by.lock()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirtied_by().is_some()
    }

    #[inline]
    pub(crate) fn mark_dirty(&self, tid: TransactionId) {
        *self.dirtied_by.lock() = Some(tid);
    }

    #[inline]
    pub(crate) fn clear_dirty(&self) {
        *self.dirtied_by.lock() = None;
    }

    // ========================================================================
    // Before-image
    // ========================================================================

    /// Copy of the content as of load or last flush.
    pub fn before_image(&self) -> Page {
        self.before_image.lock().duplicate()
    }

    /// Record `content` as the new before-image.
    ///
    /// Called right after `content` was persisted.
    pub(crate) fn refresh_before_image(&self, content: &Page) {
        self.before_image.lock().copy_from(content);
    }

    /// Overwrite the live page with the before-image and clear the dirty
    /// marker.
    pub(crate) fn restore_before_image(&self) {
        let mut page = self.page.write();
        page.copy_from(&self.before_image.lock());
        self.clear_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn frame_with(byte: u8) -> Frame {
        let mut page = Page::with_size(32);
        page.as_mut_slice()[0] = byte;
        Frame::new(PageId::new(TableId(1), 0), page)
    }

    #[test]
    fn test_frame_new_is_clean() {
        let frame = frame_with(7);
        assert!(!frame.is_dirty());
        assert_eq!(frame.dirtied_by(), None);
        assert_eq!(frame.before_image().as_slice()[0], 7);
    }

    #[test]
    fn test_dirty_marker() {
        let frame = frame_with(0);
        let tid = TransactionId::from_raw(3);

        frame.mark_dirty(tid);
        assert_eq!(frame.dirtied_by(), Some(tid));

        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_restore_before_image() {
        let frame = frame_with(1);
        frame.write().as_mut_slice()[0] = 2;
        frame.mark_dirty(TransactionId::from_raw(1));

        frame.restore_before_image();

        assert_eq!(frame.read().as_slice()[0], 1);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_refresh_before_image() {
        let frame = frame_with(1);
        frame.write().as_mut_slice()[0] = 5;

        let page = frame.read();
        frame.refresh_before_image(&page);
        drop(page);

        frame.write().as_mut_slice()[0] = 9;
        frame.restore_before_image();
        assert_eq!(frame.read().as_slice()[0], 5);
    }

    #[test]
    fn test_frame_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(frame_with(0x42));
        let mut handles = vec![];

        for _ in 0..10 {
            let frame_clone = Arc::clone(&frame);
            handles.push(thread::spawn(move || {
                assert_eq!(frame_clone.read().as_slice()[0], 0x42);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}

//! Heap File - a file-backed table of fixed-size records.
//!
//! The [`HeapFile`] is the reference [`PageSource`]:
//! - Reading and writing pages, with CRC32 checksums
//! - Appending new pages when every existing page is full
//! - Placing and removing records through the buffer pool

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::trace;

use crate::buffer::{BufferPool, PageRef};
use crate::common::config::page_size;
use crate::common::{Error, PageId, Permission, Result, TableId, TransactionId};
use crate::storage::page::{HeapPageLayout, Page, PageType};
use crate::storage::{PageSource, Record, RecordId};

struct FileState {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
}

/// A table stored as a single file of heap pages.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0    1×size   2×size    ...    N×size
/// ```
///
/// # Thread Safety
/// File access is serialized by an internal `Mutex`; the file handle is
/// shared by every transaction using the table.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct HeapFile {
    table_id: TableId,
    state: Mutex<FileState>,
    page_size: usize,
    layout: HeapPageLayout,
}

impl HeapFile {
    /// Create a new table file using the current page size.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created, or
    /// `Error::InvalidRecord` if a record of `record_size` can't fit a page.
    pub fn create<P: AsRef<Path>>(path: P, table_id: TableId, record_size: usize) -> Result<Self> {
        Self::create_with_page_size(path, table_id, record_size, page_size())
    }

    /// Create a new table file with an explicit page size.
    pub fn create_with_page_size<P: AsRef<Path>>(
        path: P,
        table_id: TableId,
        record_size: usize,
        page_size: usize,
    ) -> Result<Self> {
        let layout = Self::layout_for(page_size, record_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            table_id,
            state: Mutex::new(FileState {
                file,
                page_count: 0,
            }),
            page_size,
            layout,
        })
    }

    /// Open an existing table file using the current page size.
    pub fn open<P: AsRef<Path>>(path: P, table_id: TableId, record_size: usize) -> Result<Self> {
        Self::open_with_page_size(path, table_id, record_size, page_size())
    }

    /// Open an existing table file with an explicit page size.
    pub fn open_with_page_size<P: AsRef<Path>>(
        path: P,
        table_id: TableId,
        record_size: usize,
        page_size: usize,
    ) -> Result<Self> {
        let layout = Self::layout_for(page_size, record_size)?;
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Calculate page count from file size
        let file_size = file.metadata()?.len();
        let page_count = (file_size / page_size as u64) as u32;

        Ok(Self {
            table_id,
            state: Mutex::new(FileState { file, page_count }),
            page_size,
            layout,
        })
    }

    fn layout_for(page_size: usize, record_size: usize) -> Result<HeapPageLayout> {
        HeapPageLayout::new(page_size, record_size).ok_or_else(|| {
            Error::InvalidRecord(format!(
                "a {record_size}-byte record does not fit a {page_size}-byte page"
            ))
        })
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn layout(&self) -> HeapPageLayout {
        self.layout
    }

    /// Append a zeroed page to the file.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut state = self.state.lock();
        let pid = PageId::new(self.table_id, state.page_count);

        let offset = (pid.page_no as u64) * (self.page_size as u64);
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.write_all(&vec![0u8; self.page_size])?;
        state.file.sync_all()?;

        state.page_count += 1;
        trace!(%pid, "allocated page");
        Ok(pid)
    }

    /// Read every record of the table on behalf of `tid`.
    ///
    /// Takes a ReadOnly lock on each page.
    pub fn scan(&self, pool: &BufferPool, tid: TransactionId) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_no);
            let frame = pool.get_page(tid, pid, Permission::ReadOnly)?;
            let page = frame.read();
            if !self.layout.is_initialized(&page) {
                continue;
            }
            records.extend(
                self.layout
                    .records(&page)
                    .into_iter()
                    .map(|(slot, data)| Record::stored(RecordId::new(pid, slot as u16), data)),
            );
        }
        Ok(records)
    }

    fn check_table(&self, pid: PageId) -> Result<()> {
        if pid.table != self.table_id {
            return Err(Error::PageNotFound(pid));
        }
        Ok(())
    }

    /// Place `record` in a free slot of `frame`. Returns false if full.
    fn store(&self, frame: &PageRef, record: &mut Record) -> bool {
        let mut page = frame.write();
        if !self.layout.is_initialized(&page) {
            self.layout.init(&mut page);
        }
        let Some(slot) = self.layout.free_slot(&page) else {
            return false;
        };
        self.layout.write(&mut page, slot, &record.data);
        record.id = Some(RecordId::new(frame.page_id(), slot as u16));
        true
    }

    fn has_room(&self, page: &Page) -> bool {
        !self.layout.is_initialized(page) || self.layout.free_slot(page).is_some()
    }
}

impl PageSource for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn read_page(&self, pid: PageId) -> Result<Page> {
        self.check_table(pid)?;
        let mut state = self.state.lock();
        if pid.page_no >= state.page_count {
            return Err(Error::PageNotFound(pid));
        }

        let offset = (pid.page_no as u64) * (self.page_size as u64);
        state.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::with_size(self.page_size);
        state.file.read_exact(page.as_mut_slice())?;
        drop(state);

        match page.header() {
            Some(header) if header.page_type == PageType::Empty => {}
            Some(_) if page.verify_checksum() => {}
            _ => return Err(Error::ChecksumMismatch(pid)),
        }
        Ok(page)
    }

    fn write_page(&self, pid: PageId, page: &Page) -> Result<()> {
        self.check_table(pid)?;
        let mut stamped = page.duplicate();
        if self.layout.is_initialized(&stamped) {
            stamped.update_checksum();
        }

        let mut state = self.state.lock();
        if pid.page_no >= state.page_count {
            return Err(Error::PageNotFound(pid));
        }

        let offset = (pid.page_no as u64) * (self.page_size as u64);
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.write_all(stamped.as_slice())?;
        state.file.sync_all()?; // fsync for durability

        Ok(())
    }

    fn num_pages(&self) -> Result<u32> {
        Ok(self.state.lock().page_count)
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        record: &mut Record,
    ) -> Result<Vec<PageRef>> {
        if record.data.len() != self.layout.record_size() {
            return Err(Error::InvalidRecord(format!(
                "expected {} bytes, got {}",
                self.layout.record_size(),
                record.data.len()
            )));
        }

        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_no);
            let held_before = pool.holds_lock(tid, pid);

            let frame = pool.get_page(tid, pid, Permission::ReadOnly)?;
            let has_room = self.has_room(&frame.read());
            if !has_room {
                // Nothing was read from a full page, so the shared lock
                // this scan took can go.
                if !held_before {
                    pool.release_page(tid, pid);
                }
                continue;
            }

            let frame = pool.get_page(tid, pid, Permission::ReadWrite)?;
            if self.store(&frame, record) {
                return Ok(vec![frame]);
            }
        }

        let pid = self.allocate_page()?;
        let frame = pool.get_page(tid, pid, Permission::ReadWrite)?;
        if !self.store(&frame, record) {
            return Err(Error::InvalidRecord(format!("no room on fresh {pid}")));
        }
        Ok(vec![frame])
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        record: &Record,
    ) -> Result<Vec<PageRef>> {
        let rid = record
            .id
            .ok_or_else(|| Error::InvalidRecord("record has no id".to_string()))?;
        if rid.page.table != self.table_id {
            return Err(Error::InvalidRecord(format!(
                "{rid} is not in {}",
                self.table_id
            )));
        }

        let frame = pool.get_page(tid, rid.page, Permission::ReadWrite)?;
        let cleared = self.layout.clear(&mut frame.write(), rid.slot as usize);
        if !cleared {
            return Err(Error::InvalidRecord(format!("{rid} is empty")));
        }
        Ok(vec![frame])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: usize = 64;
    const TABLE: TableId = TableId(1);

    #[test]
    fn test_create_new_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tbl");

        let hf = HeapFile::create_with_page_size(&path, TABLE, 8, PAGE).unwrap();
        assert_eq!(hf.num_pages().unwrap(), 0);
        assert_eq!(hf.table_id(), TABLE);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tbl");

        HeapFile::create_with_page_size(&path, TABLE, 8, PAGE).unwrap();
        assert!(HeapFile::create_with_page_size(&path, TABLE, 8, PAGE).is_err());
    }

    #[test]
    fn test_record_too_large_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tbl");

        let result = HeapFile::create_with_page_size(&path, TABLE, PAGE, PAGE);
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create_with_page_size(dir.path().join("t.tbl"), TABLE, 8, PAGE).unwrap();

        let pid = hf.allocate_page().unwrap();
        assert_eq!(pid, PageId::new(TABLE, 0));

        // Fresh pages are all zeros and skip checksum verification
        let page = hf.read_page(pid).unwrap();
        assert_eq!(page.len(), PAGE);
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_stamps_checksum() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create_with_page_size(dir.path().join("t.tbl"), TABLE, 8, PAGE).unwrap();
        let pid = hf.allocate_page().unwrap();

        let mut page = Page::with_size(PAGE);
        hf.layout().init(&mut page);
        hf.layout().write(&mut page, 0, b"abcdefgh");
        hf.write_page(pid, &page).unwrap();

        let read = hf.read_page(pid).unwrap();
        assert!(read.verify_checksum());
        assert_eq!(hf.layout().read(&read, 0), Some(&b"abcdefgh"[..]));
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tbl");
        let pid;
        {
            let hf = HeapFile::create_with_page_size(&path, TABLE, 8, PAGE).unwrap();
            pid = hf.allocate_page().unwrap();
            let mut page = Page::with_size(PAGE);
            hf.layout().init(&mut page);
            hf.layout().write(&mut page, 0, b"abcdefgh");
            hf.write_page(pid, &page).unwrap();
        }

        // Flip a byte in the record area
        {
            let mut file = OpenOptions::new().write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start((PAGE - 1) as u64)).unwrap();
            file.write_all(&[0xFF]).unwrap();
        }

        let hf = HeapFile::open_with_page_size(&path, TABLE, 8, PAGE).unwrap();
        assert!(matches!(hf.read_page(pid), Err(Error::ChecksumMismatch(_))));
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tbl");

        {
            let hf = HeapFile::create_with_page_size(&path, TABLE, 8, PAGE).unwrap();
            hf.allocate_page().unwrap();
            hf.allocate_page().unwrap();
        }

        let hf = HeapFile::open_with_page_size(&path, TABLE, 8, PAGE).unwrap();
        assert_eq!(hf.num_pages().unwrap(), 2);
    }

    #[test]
    fn test_read_missing_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create_with_page_size(dir.path().join("t.tbl"), TABLE, 8, PAGE).unwrap();
        hf.allocate_page().unwrap();

        assert!(matches!(
            hf.read_page(PageId::new(TABLE, 1)),
            Err(Error::PageNotFound(_))
        ));
        // Pages of another table are never served
        assert!(matches!(
            hf.read_page(PageId::new(TableId(2), 0)),
            Err(Error::PageNotFound(_))
        ));
    }

    #[test]
    fn test_write_missing_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create_with_page_size(dir.path().join("t.tbl"), TABLE, 8, PAGE).unwrap();

        let page = Page::with_size(PAGE);
        assert!(hf.write_page(PageId::new(TABLE, 0), &page).is_err());
    }
}

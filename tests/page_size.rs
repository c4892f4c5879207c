//! Page size override.
//!
//! Kept in its own test binary: the page size is process-wide, so changing
//! it would race with tests that rely on the default.

use lockpool::common::config::DEFAULT_PAGE_SIZE;
use lockpool::{
    page_size, reset_page_size, set_page_size, BufferPool, HeapFile, Page, PageSource, Record,
    TableId, TransactionId,
};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_set_and_reset_page_size() {
    assert_eq!(page_size(), DEFAULT_PAGE_SIZE);

    set_page_size(128);
    assert_eq!(page_size(), 128);
    assert_eq!(Page::new().len(), 128);

    // Tables opened now use the small size
    let dir = tempdir().unwrap();
    let hf = HeapFile::create(dir.path().join("t.tbl"), TableId(1), 16).unwrap();
    assert_eq!(hf.page_size(), 128);

    let pool = BufferPool::new(4);
    pool.catalog().add_table(Arc::new(hf));
    let tid = TransactionId::new();
    let mut record = Record::new(vec![3u8; 16]);
    pool.insert_tuple(tid, TableId(1), &mut record).unwrap();
    pool.transaction_complete(tid).unwrap();

    let source = pool.catalog().source(TableId(1)).unwrap();
    assert_eq!(source.read_page(record.id.unwrap().page).unwrap().len(), 128);

    reset_page_size();
    assert_eq!(page_size(), DEFAULT_PAGE_SIZE);
    assert_eq!(Page::new().len(), DEFAULT_PAGE_SIZE);
}

#[test]
#[should_panic(expected = "page size must be > 0")]
fn test_zero_page_size_rejected() {
    set_page_size(0);
}

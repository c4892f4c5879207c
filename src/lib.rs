//! lockpool - A no-steal page cache with page-granularity two-phase locking.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            lockpool                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)                              │   │
//! │  │   get_page → lock → cache hit / load + evict clean       │   │
//! │  │   commit: flush dirty pages    abort: restore images     │   │
//! │  │      BufferPool + Frame + Statistics                     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                 ↓                             ↓                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐ │
//! │  │ Concurrency (concurrency/)│  │  Storage Layer (storage/)   │ │
//! │  │ LockManager (strict 2PL)  │  │ Catalog → PageSource        │ │
//! │  │ TransactionRegistry       │  │ HeapFile + Page + header    │ │
//! │  │ TimeoutPolicy             │  │                             │ │
//! │  └──────────────────────────┘  └─────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, TransactionId, Error, config)
//! - [`buffer`] - The buffer pool and its frames
//! - [`concurrency`] - Page locks and transaction bookkeeping
//! - [`storage`] - Page sources and page formats
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use lockpool::{BufferPool, HeapFile, Permission, Record, TableId, TransactionId};
//!
//! let pool = BufferPool::new(50);
//! let table = HeapFile::create("users.tbl", TableId(1), 16).unwrap();
//! pool.catalog().add_table(Arc::new(table));
//!
//! let tid = TransactionId::new();
//! let mut record = Record::new(vec![0u8; 16]);
//! pool.insert_tuple(tid, TableId(1), &mut record).unwrap();
//! pool.transaction_complete(tid).unwrap();
//!
//! let reader = TransactionId::new();
//! let rid = record.id.unwrap();
//! let frame = pool.get_page(reader, rid.page, Permission::ReadOnly).unwrap();
//! assert!(!frame.is_dirty());
//! pool.transaction_complete(reader).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{page_size, reset_page_size, set_page_size};
pub use common::{BufferPoolConfig, Error, PageId, Permission, Result, TableId, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, Frame, PageRef, StatsSnapshot};
pub use concurrency::{Lock, LockManager, LockState, TransactionRegistry};
pub use storage::page::{HeapPageLayout, Page, PageHeader, PageType};
pub use storage::{Catalog, HeapFile, PageSource, Record, RecordId};

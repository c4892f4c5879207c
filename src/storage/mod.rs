//! Storage layer - page sources and page formats.
//!
//! This module handles persistent storage:
//! - [`PageSource`] - What the buffer pool reads pages from and writes them to
//! - [`HeapFile`] - File-backed table of fixed-size records
//! - [`Catalog`] - Table id to page source lookup
//! - [`page`] - Page types and layouts

mod catalog;
mod heap_file;
pub mod page;
mod page_source;
mod record;

pub use catalog::Catalog;
pub use heap_file::HeapFile;
pub use page_source::PageSource;
pub use record::{Record, RecordId};

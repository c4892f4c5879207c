//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between page sources and the
//! transactions that read and modify pages. It holds a bounded number of
//! frames, each one the only cached copy of its page.
//!
//! # Components
//! - [`BufferPool`] - The page cache and transaction boundary
//! - [`Frame`] - A cached page + dirty marker + before-image
//! - [`BufferPoolStats`] - Performance statistics

use std::sync::Arc;

mod buffer_pool;
mod frame;
mod stats;

pub use buffer_pool::BufferPool;
pub use frame::Frame;
pub use stats::{BufferPoolStats, StatsSnapshot};

/// Shared handle to a cached frame.
///
/// Every `get_page` caller for the same cached page gets a clone of the same
/// `Arc`, so a change made through one handle is seen through all of them.
pub type PageRef = Arc<Frame>;

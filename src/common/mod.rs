//! Common types and utilities shared across lockpool.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (page size, pool settings)
//! - Error types
//! - Identifiers (TableId, PageId, TransactionId) and Permission

pub mod config;
pub mod error;
mod page_id;
mod transaction_id;

pub use config::BufferPoolConfig;
pub use error::{Error, Result};
pub use page_id::{PageId, TableId};
pub use transaction_id::{Permission, TransactionId};

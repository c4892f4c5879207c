//! Concurrency control.
//!
//! # Components
//! - [`LockManager`] - Page locks under strict two-phase locking
//! - [`Lock`] / [`LockState`] - Lock records and per-page holder state
//! - [`TransactionRegistry`] - Active transaction bookkeeping
//! - [`TimeoutPolicy`] - Randomized lock wait windows

mod lock;
mod lock_manager;
mod timeout;
mod transaction_registry;

pub use lock::{Lock, LockState};
pub use lock_manager::{Grant, LockManager};
pub use timeout::TimeoutPolicy;
pub use transaction_registry::TransactionRegistry;

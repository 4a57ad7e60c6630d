//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between table files and
//! the operators that read them. It holds a bounded set of pages and hands
//! them out under page-level transaction locks.
//!
//! # Components
//! - [`BufferPool`] - The transactional page cache
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool;
pub mod replacer;
mod stats;

pub use buffer_pool::BufferPool;
pub use stats::{BufferPoolStats, StatsSnapshot};

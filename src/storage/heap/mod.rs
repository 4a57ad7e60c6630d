//! Heap files: unordered tables of fixed-width tuples.
//!
//! - [`HeapFile`] - the [`crate::storage::DbFile`] implementation
//! - [`SlotLayout`] - slotted page geometry
//! - [`HeapFileIterator`] - page-at-a-time scan through the buffer pool

mod heap_file;
mod heap_file_iterator;
mod heap_page;

pub use heap_file::HeapFile;
pub use heap_file_iterator::HeapFileIterator;
pub use heap_page::SlotLayout;

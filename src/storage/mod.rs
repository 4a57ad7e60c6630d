//! Storage layer - disk I/O, page formats and table files.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level file I/O
//! - [`page`] - Page types and layouts
//! - [`DbFile`] - The page-source interface the buffer pool consumes
//! - [`heap`] - Heap file implementation and its iterator
//! - [`Catalog`] - Table registry

mod catalog;
mod db_file;
mod disk_manager;
pub mod heap;
pub mod page;

pub use catalog::Catalog;
pub use db_file::{DbFile, DbFileIterator};
pub use disk_manager::DiskManager;
pub use heap::{HeapFile, HeapFileIterator};

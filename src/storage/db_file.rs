//! The page-source interface the buffer pool reads and writes through.

use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::storage::page::{Page, PageRef};
use crate::tuple::{Tuple, TupleDesc};

/// A table's on-disk representation.
///
/// Implementations are registered once in the [`crate::storage::Catalog`];
/// the buffer pool resolves a page's file by its table id and calls
/// [`DbFile::read_page`] on a miss and [`DbFile::write_page`] on flush.
pub trait DbFile: Send + Sync {
    fn id(&self) -> TableId;

    fn tuple_desc(&self) -> &Arc<TupleDesc>;

    /// Read a page from storage. Never goes through the buffer pool.
    fn read_page(&self, pid: PageId) -> Result<Page>;

    /// Write a page back to storage.
    fn write_page(&self, page: &Page) -> Result<()>;

    /// Number of pages currently in the file.
    fn num_pages(&self) -> u32;

    /// Add a tuple on behalf of `tid`.
    ///
    /// Pages are obtained through `pool` with write permission. Returns every
    /// page that was modified; the caller marks them dirty.
    fn insert_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: Tuple)
        -> Result<Vec<PageRef>>;

    /// Remove the tuple named by `tuple`'s record id on behalf of `tid`.
    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>>;
}

/// Cursor over the tuples of a [`DbFile`].
///
/// `has_next` on an iterator that is not open is `false`; `next` without a
/// tuple to return fails with [`crate::common::Error::NoSuchElement`].
pub trait DbFileIterator: Send {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);
}

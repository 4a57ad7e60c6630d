//! Sequential scan over a heap file, one page at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Error, PageId, Permissions, Result, TransactionId};
use crate::storage::heap::HeapFile;
use crate::storage::{DbFile, DbFileIterator};
use crate::tuple::Tuple;

/// Iterates a [`HeapFile`]'s tuples in page order, then slot order.
///
/// Each page is fetched through the buffer pool with read-only permission
/// when the scan reaches it, so the scanning transaction acquires shared
/// locks page by page. Empty pages are skipped.
pub struct HeapFileIterator {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    file: Arc<HeapFile>,
    next_page: u32,
    buffered: VecDeque<Tuple>,
    is_open: bool,
}

impl HeapFileIterator {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, file: Arc<HeapFile>) -> Self {
        Self {
            pool,
            tid,
            file,
            next_page: 0,
            buffered: VecDeque::new(),
            is_open: false,
        }
    }

    fn load_next_page(&mut self) -> Result<()> {
        let pid = PageId::new(self.file.id(), self.next_page);
        let page_ref = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let tuples = self.file.tuples_on(&page_ref.read())?;

        self.next_page += 1;
        self.buffered = tuples.into();
        Ok(())
    }
}

impl DbFileIterator for HeapFileIterator {
    fn open(&mut self) -> Result<()> {
        self.buffered.clear();
        self.next_page = 0;
        self.is_open = true;
        if self.file.num_pages() > 0 {
            self.load_next_page()?;
        }
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.is_open {
            return Ok(false);
        }
        while self.buffered.is_empty() {
            if self.next_page >= self.file.num_pages() {
                return Ok(false);
            }
            self.load_next_page()?;
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(Error::NoSuchElement("no more tuples in this file".into()));
        }
        self.buffered
            .pop_front()
            .ok_or_else(|| Error::NoSuchElement("no more tuples in this file".into()))
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.buffered.clear();
        self.is_open = false;
    }
}

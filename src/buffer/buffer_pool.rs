//! Buffer Pool - the transactional page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between table files and memory
//! - Page-level locking through the [`LockManager`]
//! - FIFO eviction that never writes out uncommitted data (no-steal)
//! - Force-at-commit and in-place rollback at abort

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::BufferPoolStats;
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::concurrency::LockManager;
use crate::storage::page::PageRef;
use crate::storage::Catalog;
use crate::tuple::Tuple;

/// Cached pages plus their eviction order. Guarded by one mutex.
#[derive(Default)]
struct PageCache {
    pages: HashMap<PageId, PageRef>,
    replacer: FifoReplacer,
}

/// Caches up to `max_pages` pages and arbitrates access to them.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                          BufferPool                          │
/// │  ┌──────────────────┐   ┌─────────────────────────────────┐  │
/// │  │   LockManager    │   │     cache: Mutex<PageCache>     │  │
/// │  │ S/X locks, graph │   │  pages: PageId → PageRef        │  │
/// │  └──────────────────┘   │  replacer: FifoReplacer         │  │
/// │                         └─────────────────────────────────┘  │
/// │  ┌──────────────────┐   ┌─────────────────────────────────┐  │
/// │  │  Arc<Catalog>    │   │  stats: BufferPoolStats         │  │
/// │  │ TableId → DbFile │   │  (atomic counters)              │  │
/// │  └──────────────────┘   └─────────────────────────────────┘  │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking order
/// A page lock from the [`LockManager`] is always acquired before the cache
/// mutex. While the cache mutex is held, page `RwLock`s are only probed with
/// `try_read`, and page I/O for flushing happens after the mutex is dropped.
///
/// # Usage
/// ```no_run
/// use std::sync::Arc;
/// use stratadb::buffer::BufferPool;
/// use stratadb::common::config::BufferPoolConfig;
/// use stratadb::common::{PageId, Permissions, TransactionId};
/// use stratadb::storage::{Catalog, HeapFile};
/// use stratadb::tuple::{TupleDesc, Type};
///
/// let catalog = Arc::new(Catalog::new());
/// let file = HeapFile::open_or_create("t.dat", TupleDesc::new(&[Type::Int])).unwrap();
/// let table = catalog.add_table(Arc::new(file), "t");
/// let pool = BufferPool::new(BufferPoolConfig::default(), catalog);
///
/// let tid = TransactionId::new();
/// let page = pool.get_page(tid, PageId::new(table, 0), Permissions::ReadOnly).unwrap();
/// let first_byte = page.read().data()[0];
/// pool.transaction_complete(tid, true).unwrap();
/// ```
pub struct BufferPool {
    max_pages: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    cache: Mutex<PageCache>,
    stats: BufferPoolStats,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            max_pages: config.max_pages,
            catalog,
            lock_manager: LockManager::new(config.lock_timeout),
            cache: Mutex::new(PageCache::default()),
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Page access
    // ========================================================================

    /// Fetch a page on behalf of `tid`.
    ///
    /// Acquires a shared lock for [`Permissions::ReadOnly`] or an exclusive
    /// lock for [`Permissions::ReadWrite`] first, blocking while another
    /// transaction holds a conflicting lock. Then returns the cached page, or
    /// reads it from its table's file, evicting a clean page if the pool is
    /// full.
    ///
    /// # Errors
    /// - `Error::TransactionAborted` on deadlock or lock timeout
    /// - `Error::NoEvictablePage` if every cached page is dirty or write-locked
    /// - `Error::TableNotFound`, `Error::Io`, `Error::CorruptPage` from the read
    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permissions) -> Result<PageRef> {
        match perm {
            Permissions::ReadOnly => self.lock_manager.acquire_read_lock(tid, pid)?,
            Permissions::ReadWrite => self.lock_manager.acquire_write_lock(tid, pid)?,
        }

        let mut cache = self.cache.lock();
        if let Some(page_ref) = cache.pages.get(&pid) {
            BufferPoolStats::bump(&self.stats.cache_hits);
            return Ok(Arc::clone(page_ref));
        }
        BufferPoolStats::bump(&self.stats.cache_misses);

        if cache.pages.len() >= self.max_pages {
            self.evict(&mut cache)?;
        }

        let page = self.catalog.file(pid.table_id)?.read_page(pid)?;
        BufferPoolStats::bump(&self.stats.pages_read);
        trace!(%pid, %tid, ?perm, "loaded page");

        let page_ref = page.into_ref();
        cache.pages.insert(pid, Arc::clone(&page_ref));
        cache.replacer.record(pid);
        Ok(page_ref)
    }

    /// Release `tid`'s lock on a single page before the transaction ends.
    ///
    /// Only safe when `tid` did not change the page.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release_lock(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    // ========================================================================
    // Tuple mutation
    // ========================================================================

    /// Add `tuple` to table `table_id` on behalf of `tid`.
    ///
    /// Every page the file changes is fetched with an exclusive lock, marked
    /// dirty by `tid` and kept in the cache.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: Tuple) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        for page_ref in pages {
            self.cache_dirty(tid, page_ref)?;
        }
        Ok(())
    }

    /// Remove `tuple` from the table its record id points into.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| Error::TupleNotFound("tuple has no record id".into()))?;
        let file = self.catalog.file(rid.page_id.table_id)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        for page_ref in pages {
            self.cache_dirty(tid, page_ref)?;
        }
        Ok(())
    }

    /// Mark a page dirty by `tid` and make sure the cache holds this handle.
    fn cache_dirty(&self, tid: TransactionId, page_ref: PageRef) -> Result<()> {
        let pid = {
            let mut page = page_ref.write();
            page.mark_dirty(Some(tid));
            page.id()
        };

        let mut cache = self.cache.lock();
        let same_handle = cache.pages.get(&pid).map(|cached| Arc::ptr_eq(cached, &page_ref));
        match same_handle {
            Some(true) => {}
            Some(false) => {
                cache.pages.insert(pid, page_ref);
            }
            None => {
                if cache.pages.len() >= self.max_pages {
                    self.evict(&mut cache)?;
                }
                cache.pages.insert(pid, page_ref);
                cache.replacer.record(pid);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Transaction completion
    // ========================================================================

    /// Commit or abort `tid`.
    ///
    /// On commit, every page `tid` locked and dirtied is written to its file.
    /// On abort, those pages are restored to their before-image in place.
    /// All of `tid`'s locks are released either way, even if a write fails;
    /// the first write error is returned.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let mut pages: Vec<PageId> = self.lock_manager.locked_pages(tid).into_iter().collect();
        pages.sort();

        let mut first_err = None;
        if commit {
            for &pid in &pages {
                if let Err(e) = self.flush_page_if(pid, |owner| owner == Some(tid)) {
                    first_err.get_or_insert(e);
                }
            }
        } else {
            for &pid in &pages {
                self.rollback_page(tid, pid);
            }
        }

        self.lock_manager.release_all_locks(tid);
        debug!(%tid, commit, pages = pages.len(), "transaction complete");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn rollback_page(&self, tid: TransactionId, pid: PageId) {
        let Some(page_ref) = self.cached(pid) else {
            return;
        };
        let mut page = page_ref.write();
        if page.dirtied_by() == Some(tid) {
            page.rollback();
            BufferPoolStats::bump(&self.stats.rollbacks);
            trace!(%pid, %tid, "rolled back page");
        }
    }

    // ========================================================================
    // Flushing and discarding
    // ========================================================================

    /// Write every dirty cached page, regardless of which transaction
    /// dirtied it. Keeps going past failures and returns the first one.
    pub fn flush_all_pages(&self) -> Result<()> {
        self.flush_where(|_| true)
    }

    /// Write the cached pages dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        self.flush_where(|owner| owner == Some(tid))
    }

    /// Write a page back if it is cached and dirty.
    ///
    /// On success the page becomes clean and its before-image is refreshed.
    /// On failure it stays dirty.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        self.flush_page_if(pid, |_| true)
    }

    /// Drop a page from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        let mut cache = self.cache.lock();
        if cache.pages.remove(&pid).is_some() {
            cache.replacer.remove(pid);
            debug!(%pid, "discarded page");
        }
    }

    fn flush_where<F>(&self, wanted: F) -> Result<()>
    where
        F: Fn(Option<TransactionId>) -> bool + Copy,
    {
        let pids: Vec<PageId> = self.cache.lock().replacer.iter().collect();

        let mut first_err = None;
        for pid in pids {
            if let Err(e) = self.flush_page_if(pid, wanted) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn flush_page_if<F>(&self, pid: PageId, wanted: F) -> Result<()>
    where
        F: Fn(Option<TransactionId>) -> bool,
    {
        let Some(page_ref) = self.cached(pid) else {
            return Ok(());
        };
        let mut page = page_ref.write();
        if !page.is_dirty() || !wanted(page.dirtied_by()) {
            return Ok(());
        }

        let written = self
            .catalog
            .file(pid.table_id)
            .and_then(|file| file.write_page(&page));
        match written {
            Ok(()) => {
                page.set_before_image();
                page.mark_dirty(None);
                BufferPoolStats::bump(&self.stats.pages_written);
                trace!(%pid, "flushed page");
                Ok(())
            }
            Err(e) => {
                error!(%pid, error = %e, "failed to flush page");
                Err(e)
            }
        }
    }

    fn cached(&self, pid: PageId) -> Option<PageRef> {
        self.cache.lock().pages.get(&pid).cloned()
    }

    /// Drop the oldest clean page. Never writes.
    ///
    /// A page that is write-locked right now counts as in use, so this can
    /// fail while a clean page is still cached.
    fn evict(&self, cache: &mut PageCache) -> Result<()> {
        let PageCache { pages, replacer } = cache;
        let victim = replacer.victim(|pid| match pages.get(&pid) {
            Some(page_ref) => page_ref.try_read().is_some_and(|page| !page.is_dirty()),
            None => true,
        });

        match victim {
            Some(pid) => {
                pages.remove(&pid);
                BufferPoolStats::bump(&self.stats.evictions);
                debug!(%pid, "evicted page");
                Ok(())
            }
            None => Err(Error::NoEvictablePage {
                capacity: self.max_pages,
            }),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn cached_page_count(&self) -> usize {
        self.cache.lock().pages.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.cache.lock().pages.contains_key(&pid)
    }

    /// Cached page ids, oldest first.
    pub fn cached_pages(&self) -> Vec<PageId> {
        self.cache.lock().replacer.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DbFile, HeapFile};
    use crate::tuple::{Field, TupleDesc, Type};
    use tempfile::{tempdir, TempDir};

    fn setup(max_pages: usize) -> (TempDir, BufferPool, TableId, Arc<TupleDesc>) {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let file = HeapFile::create(dir.path().join("t.dat"), TupleDesc::new(&[Type::Int])).unwrap();
        let desc = Arc::clone(file.tuple_desc());
        let table = catalog.add_table(Arc::new(file), "t");
        let pool = BufferPool::new(
            BufferPoolConfig::default().with_max_pages(max_pages),
            catalog,
        );
        (dir, pool, table, desc)
    }

    fn int_tuple(desc: &Arc<TupleDesc>, v: i32) -> Tuple {
        Tuple::new(Arc::clone(desc), vec![Field::Int(v)]).unwrap()
    }

    #[test]
    fn test_insert_marks_page_dirty_and_locks_it() {
        let (_dir, pool, table, desc) = setup(4);
        let tid = TransactionId::new();

        pool.insert_tuple(tid, table, int_tuple(&desc, 1)).unwrap();

        let pid = PageId::new(table, 0);
        assert!(pool.is_cached(pid));
        assert_eq!(
            pool.lock_manager().lock_mode(tid, pid),
            Some(crate::concurrency::LockMode::Exclusive)
        );
        let page = pool.get_page(tid, pid, Permissions::ReadOnly).unwrap();
        assert_eq!(page.read().dirtied_by(), Some(tid));
    }

    #[test]
    fn test_abort_restores_before_image() {
        let (_dir, pool, table, desc) = setup(4);
        let setup_tid = TransactionId::new();
        pool.insert_tuple(setup_tid, table, int_tuple(&desc, 1)).unwrap();
        pool.transaction_complete(setup_tid, true).unwrap();

        let pid = PageId::new(table, 0);
        let before = pool.cached(pid).unwrap().read().data().to_vec();

        let tid = TransactionId::new();
        pool.insert_tuple(tid, table, int_tuple(&desc, 2)).unwrap();
        pool.transaction_complete(tid, false).unwrap();

        let reader = TransactionId::new();
        let page = pool.get_page(reader, pid, Permissions::ReadOnly).unwrap();
        assert!(!page.read().is_dirty());
        assert_eq!(page.read().data(), &before[..]);
        assert_eq!(pool.stats().snapshot().rollbacks, 1);
    }

    #[test]
    fn test_complete_without_locks_is_noop() {
        let (_dir, pool, _table, _desc) = setup(2);
        let tid = TransactionId::new();
        pool.transaction_complete(tid, false).unwrap();
        pool.transaction_complete(tid, true).unwrap();
        assert_eq!(pool.cached_page_count(), 0);
    }

    #[test]
    fn test_discard_page() {
        let (_dir, pool, table, desc) = setup(2);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, table, int_tuple(&desc, 1)).unwrap();

        let pid = PageId::new(table, 0);
        pool.discard_page(pid);
        assert!(!pool.is_cached(pid));
        assert!(pool.cached_pages().is_empty());
    }
}

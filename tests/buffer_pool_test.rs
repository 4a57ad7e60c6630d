//! Integration tests for the buffer pool.
//!
//! These exercise the pool together with real heap files: eviction order,
//! no-steal, commit durability, abort rollback and page locking.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use stratadb::buffer::BufferPool;
use stratadb::common::config::BufferPoolConfig;
use stratadb::common::{Error, PageId, Permissions, TableId, TransactionId};
use stratadb::concurrency::LockMode;
use stratadb::storage::{Catalog, DbFile, DbFileIterator, HeapFile};
use stratadb::tuple::{Field, Tuple, TupleDesc, Type};
use tempfile::{tempdir, TempDir};

/// One int column plus padding, so only a handful of tuples fit per page.
fn wide_desc() -> TupleDesc {
    let mut columns = vec![(Type::Int, "id")];
    columns.extend(std::iter::repeat((Type::Str, "pad")).take(7));
    TupleDesc::named(&columns)
}

fn row(desc: &Arc<TupleDesc>, id: i32) -> Tuple {
    let mut fields = vec![Field::Int(id)];
    fields.extend((0..7).map(|_| Field::from("x")));
    Tuple::new(Arc::clone(desc), fields).unwrap()
}

struct Db {
    _dir: TempDir,
    catalog: Arc<Catalog>,
    file: Arc<HeapFile>,
    table: TableId,
}

impl Db {
    fn pool(&self, max_pages: usize) -> BufferPool {
        BufferPool::new(
            BufferPoolConfig::default()
                .with_max_pages(max_pages)
                .with_lock_timeout(Some(Duration::from_secs(5))),
            Arc::clone(&self.catalog),
        )
    }

    fn pid(&self, n: u32) -> PageId {
        PageId::new(self.table, n)
    }

    fn desc(&self) -> Arc<TupleDesc> {
        Arc::clone(self.file.tuple_desc())
    }
}

fn scan_ids(file: &Arc<HeapFile>, pool: Arc<BufferPool>) -> Vec<i32> {
    let tid = TransactionId::new();
    let mut it = file.iter(Arc::clone(&pool), tid);
    it.open().unwrap();
    let mut ids = Vec::new();
    while it.has_next().unwrap() {
        match it.next().unwrap().field(0).unwrap() {
            Field::Int(v) => ids.push(*v),
            other => panic!("unexpected field {other}"),
        }
    }
    it.close();
    pool.transaction_complete(tid, true).unwrap();
    ids
}

/// A table with `pages` full pages, committed to disk.
fn populate(pages: u32) -> Db {
    let dir = tempdir().unwrap();
    let file = Arc::new(HeapFile::create(dir.path().join("t.dat"), wide_desc()).unwrap());
    let catalog = Arc::new(Catalog::new());
    let table = catalog.add_table(file.clone(), "t");
    let db = Db {
        _dir: dir,
        catalog,
        file,
        table,
    };

    let loader = db.pool(pages as usize + 1);
    let tid = TransactionId::new();
    let per_page = db.file.layout().num_slots() as u32;
    for id in 0..pages * per_page {
        loader.insert_tuple(tid, table, row(&db.desc(), id as i32)).unwrap();
    }
    loader.transaction_complete(tid, true).unwrap();
    assert_eq!(db.file.num_pages(), pages);
    db
}

/// Make `pid` dirty by deleting its first tuple on behalf of `tid`.
fn dirty(db: &Db, pool: &BufferPool, tid: TransactionId, pid: PageId) {
    let page = pool.get_page(tid, pid, Permissions::ReadWrite).unwrap();
    let victim = db.file.tuples_on(&page.read()).unwrap().remove(0);
    pool.delete_tuple(tid, &victim).unwrap();
}

#[test]
fn test_get_page_caches() {
    let db = populate(2);
    let pool = db.pool(4);
    let tid = TransactionId::new();

    let a = pool.get_page(tid, db.pid(0), Permissions::ReadOnly).unwrap();
    let b = pool.get_page(tid, db.pid(0), Permissions::ReadOnly).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    let stats = pool.stats().snapshot();
    assert_eq!((stats.cache_hits, stats.cache_misses), (1, 1));
}

#[test]
fn test_fifo_eviction_order() {
    let db = populate(3);
    let pool = db.pool(2);
    let tid = TransactionId::new();

    for n in [0, 1, 2] {
        pool.get_page(tid, db.pid(n), Permissions::ReadOnly).unwrap();
    }
    assert_eq!(pool.cached_pages(), vec![db.pid(1), db.pid(2)]);

    // Re-reading a cached page does not refresh its position
    pool.get_page(tid, db.pid(1), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, db.pid(0), Permissions::ReadOnly).unwrap();
    assert_eq!(pool.cached_pages(), vec![db.pid(2), db.pid(0)]);
    assert_eq!(pool.stats().snapshot().evictions, 2);
}

#[test]
fn test_dirty_pages_are_not_evicted() {
    let db = populate(3);
    let pool = db.pool(2);
    let writer = TransactionId::new();
    let reader = TransactionId::new();

    dirty(&db, &pool, writer, db.pid(0));
    pool.get_page(reader, db.pid(1), Permissions::ReadOnly).unwrap();
    pool.get_page(reader, db.pid(2), Permissions::ReadOnly).unwrap();

    assert!(pool.is_cached(db.pid(0)));
    assert!(!pool.is_cached(db.pid(1)));
    assert_eq!(pool.cached_page_count(), 2);
}

#[test]
fn test_no_evictable_page() {
    let db = populate(3);
    let pool = db.pool(2);
    let tid = TransactionId::new();

    dirty(&db, &pool, tid, db.pid(0));
    dirty(&db, &pool, tid, db.pid(1));

    let err = pool
        .get_page(tid, db.pid(2), Permissions::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, Error::NoEvictablePage { capacity: 2 }));
    assert_eq!(pool.cached_page_count(), 2);

    // Committing makes the pages clean, so eviction works again
    pool.transaction_complete(tid, true).unwrap();
    let next = TransactionId::new();
    pool.get_page(next, db.pid(2), Permissions::ReadOnly).unwrap();
}

#[test]
fn test_write_guarded_clean_page_is_not_evicted() {
    let db = populate(2);
    let pool = db.pool(1);
    let tid = TransactionId::new();

    let page = pool.get_page(tid, db.pid(0), Permissions::ReadOnly).unwrap();
    let guard = page.write();
    assert!(!guard.is_dirty());

    let err = pool
        .get_page(tid, db.pid(1), Permissions::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, Error::NoEvictablePage { capacity: 1 }));
    assert!(err.to_string().contains("clean and unlocked"));

    drop(guard);
    pool.get_page(tid, db.pid(1), Permissions::ReadOnly).unwrap();
    assert_eq!(pool.cached_pages(), vec![db.pid(1)]);
}

#[test]
fn test_commit_is_durable() {
    let db = populate(1);
    {
        let pool = db.pool(4);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, db.table, row(&db.desc(), 1000)).unwrap();
        pool.transaction_complete(tid, true).unwrap();
        assert_eq!(pool.stats().snapshot().pages_written, 1);
    }

    // A new pool over a reopened file sees the committed tuple
    let reopened = Arc::new(HeapFile::open(db.file.path(), wide_desc()).unwrap());
    let catalog = Arc::new(Catalog::new());
    catalog.add_table(reopened.clone(), "t");
    let pool = Arc::new(BufferPool::new(BufferPoolConfig::default(), catalog));

    let ids = scan_ids(&reopened, pool);
    assert!(ids.contains(&1000));
    assert_eq!(ids.len(), db.file.layout().num_slots() + 1);
}

#[test]
fn test_abort_rolls_back() {
    let db = populate(1);
    let pool = Arc::new(db.pool(4));
    let before = scan_ids(&db.file, Arc::clone(&pool));

    let tid = TransactionId::new();
    pool.insert_tuple(tid, db.table, row(&db.desc(), 77)).unwrap();
    dirty(&db, &pool, tid, db.pid(0));
    pool.transaction_complete(tid, false).unwrap();

    assert_eq!(scan_ids(&db.file, Arc::clone(&pool)), before);
    assert!(pool.lock_manager().locked_pages(tid).is_empty());

    // Nothing reached disk either
    let disk_page = db.file.read_page(db.pid(0)).unwrap();
    assert_eq!(db.file.tuples_on(&disk_page).unwrap().len(), before.len());
}

#[test]
fn test_insert_and_delete_take_exclusive_locks() {
    let db = populate(2);
    let pool = db.pool(4);
    let tid = TransactionId::new();

    let page = pool.get_page(tid, db.pid(1), Permissions::ReadOnly).unwrap();
    let victim = db.file.tuples_on(&page.read()).unwrap().remove(0);
    assert_eq!(
        pool.lock_manager().lock_mode(tid, db.pid(1)),
        Some(LockMode::Shared)
    );

    pool.delete_tuple(tid, &victim).unwrap();
    assert_eq!(
        pool.lock_manager().lock_mode(tid, db.pid(1)),
        Some(LockMode::Exclusive)
    );

    // Page 0 is full, so the insert lands in the slot freed on page 1
    pool.insert_tuple(tid, db.table, row(&db.desc(), 5)).unwrap();
    assert_eq!(pool.lock_manager().lock_mode(tid, db.pid(0)), None);
    assert_eq!(
        pool.lock_manager().lock_mode(tid, db.pid(1)),
        Some(LockMode::Exclusive)
    );
    assert_eq!(page.read().dirtied_by(), Some(tid));
}

#[test]
fn test_full_pages_scanned_by_insert_are_released() {
    let db = populate(2);
    let pool = db.pool(4);
    let tid = TransactionId::new();

    pool.insert_tuple(tid, db.table, row(&db.desc(), 5)).unwrap();

    let locked = pool.lock_manager().locked_pages(tid);
    assert_eq!(locked.len(), 1);
    assert!(locked.contains(&db.pid(2)));
}

#[test]
fn test_writer_blocks_reader_until_commit() {
    let db = populate(1);
    let pool = Arc::new(db.pool(4));
    let writer = TransactionId::new();
    dirty(&db, &pool, writer, db.pid(0));

    let pid = db.pid(0);
    let reader_pool = Arc::clone(&pool);
    let reader = thread::spawn(move || {
        let tid = TransactionId::new();
        let page = reader_pool.get_page(tid, pid, Permissions::ReadOnly)?;
        let dirty = page.read().is_dirty();
        reader_pool.transaction_complete(tid, true)?;
        Ok::<_, Error>(dirty)
    });

    thread::sleep(Duration::from_millis(100));
    assert!(!reader.is_finished());

    pool.transaction_complete(writer, true).unwrap();
    assert!(!reader.join().unwrap().unwrap());
}

#[test]
fn test_lock_timeout_aborts() {
    let db = populate(1);
    let pool = BufferPool::new(
        BufferPoolConfig::default().with_lock_timeout(Some(Duration::from_millis(50))),
        Arc::clone(&db.catalog),
    );
    let writer = TransactionId::new();
    pool.get_page(writer, db.pid(0), Permissions::ReadWrite).unwrap();

    let other = TransactionId::new();
    let err = pool
        .get_page(other, db.pid(0), Permissions::ReadOnly)
        .unwrap_err();
    assert!(err.is_transaction_aborted());
    pool.transaction_complete(other, false).unwrap();
}

#[test]
fn test_deadlock_aborts_one_transaction() {
    let db = populate(2);
    let pool = Arc::new(db.pool(4));
    let (p0, p1) = (db.pid(0), db.pid(1));

    let run = |first: PageId, second: PageId| {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let tid = TransactionId::new();
            pool.get_page(tid, first, Permissions::ReadOnly).unwrap();
            thread::sleep(Duration::from_millis(50));
            let outcome = pool.get_page(tid, second, Permissions::ReadWrite).map(|_| ());
            pool.transaction_complete(tid, outcome.is_ok()).unwrap();
            outcome
        })
    };
    let a = run(p0, p1);
    let b = run(p1, p0);

    let outcomes = [a.join().unwrap(), b.join().unwrap()];
    let aborted = outcomes
        .iter()
        .filter(|o| matches!(o, Err(e) if e.is_transaction_aborted()))
        .count();
    assert!(aborted >= 1);
    assert!(outcomes.iter().all(|o| o.is_ok() || matches!(o, Err(e) if e.is_transaction_aborted())));
}

#[test]
fn test_flush_page_makes_change_survive_abort() {
    let db = populate(1);
    let pool = db.pool(4);
    let tid = TransactionId::new();

    dirty(&db, &pool, tid, db.pid(0));
    pool.flush_page(db.pid(0)).unwrap();
    pool.transaction_complete(tid, false).unwrap();

    let disk_page = db.file.read_page(db.pid(0)).unwrap();
    assert_eq!(
        db.file.tuples_on(&disk_page).unwrap().len(),
        db.file.layout().num_slots() - 1
    );
}

#[test]
fn test_flush_pages_only_writes_own_pages() {
    let db = populate(2);
    let pool = db.pool(4);
    let (t1, t2) = (TransactionId::new(), TransactionId::new());

    dirty(&db, &pool, t1, db.pid(0));
    dirty(&db, &pool, t2, db.pid(1));
    pool.flush_pages(t1).unwrap();

    let p0 = pool.get_page(t1, db.pid(0), Permissions::ReadOnly).unwrap();
    let p1 = pool.get_page(t2, db.pid(1), Permissions::ReadOnly).unwrap();
    assert!(!p0.read().is_dirty());
    assert_eq!(p1.read().dirtied_by(), Some(t2));

    pool.flush_all_pages().unwrap();
    assert!(!p1.read().is_dirty());
}

#[test]
fn test_commit_surfaces_flush_error_and_releases_locks() {
    let db = populate(1);
    let pool = db.pool(4);
    let tid = TransactionId::new();
    dirty(&db, &pool, tid, db.pid(0));

    db.catalog.clear();
    let err = pool.transaction_complete(tid, true).unwrap_err();

    assert!(matches!(err, Error::TableNotFound(_)));
    assert!(pool.lock_manager().locked_pages(tid).is_empty());
    assert!(pool.is_cached(db.pid(0)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_clean_reads_evict_in_fifo_order(
        accesses in proptest::collection::vec(0u32..5, 1..40),
        capacity in 1usize..5,
    ) {
        let db = populate(5);
        let pool = db.pool(capacity);
        let tid = TransactionId::new();

        let mut model: Vec<u32> = Vec::new();
        for n in accesses {
            pool.get_page(tid, db.pid(n), Permissions::ReadOnly).unwrap();
            if !model.contains(&n) {
                if model.len() == capacity {
                    model.remove(0);
                }
                model.push(n);
            }
            prop_assert!(pool.cached_page_count() <= capacity);
        }

        let expected: Vec<PageId> = model.into_iter().map(|n| db.pid(n)).collect();
        prop_assert_eq!(pool.cached_pages(), expected);
    }
}

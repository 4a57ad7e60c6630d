//! StrataDB - a transactional page cache and pull-based join engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            StrataDB                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Execution (execution/)                      │   │
//! │  │        OpIterator: Join, SeqScan, TupleIterator          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Buffer Pool (buffer/)                      │   │
//! │  │   page cache + FIFO no-steal eviction + commit/abort     │   │
//! │  │          ↔  LockManager (concurrency/)                   │   │
//! │  │     page-level S/X locks + waits-for deadlock check      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Storage (storage/)                         │   │
//! │  │   Catalog → DbFile (HeapFile) → DiskManager + Page       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (ids, Error, config)
//! - [`tuple`] - Field types, schemas and tuples
//! - [`storage`] - Disk I/O, page formats, heap files and the catalog
//! - [`concurrency`] - Page lock manager
//! - [`buffer`] - Buffer pool and eviction policy
//! - [`execution`] - Operators
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use stratadb::buffer::BufferPool;
//! use stratadb::common::config::BufferPoolConfig;
//! use stratadb::common::TransactionId;
//! use stratadb::execution::{collect, OpIterator, SeqScan};
//! use stratadb::storage::{Catalog, HeapFile};
//! use stratadb::tuple::{Field, Tuple, TupleDesc, Type};
//!
//! let catalog = Arc::new(Catalog::new());
//! let file = Arc::new(HeapFile::open_or_create("users.dat", TupleDesc::named(&[(Type::Int, "id")])).unwrap());
//! let table = catalog.add_table(file.clone(), "users");
//! let pool = Arc::new(BufferPool::new(BufferPoolConfig::default(), catalog.clone()));
//!
//! let tid = TransactionId::new();
//! let desc = catalog.tuple_desc(table).unwrap();
//! pool.insert_tuple(tid, table, Tuple::new(desc, vec![Field::Int(1)]).unwrap()).unwrap();
//! pool.transaction_complete(tid, true).unwrap();
//!
//! let reader = TransactionId::new();
//! let mut scan = SeqScan::new(pool.clone(), reader, file, "u");
//! scan.open().unwrap();
//! let rows = collect(&mut scan).unwrap();
//! pool.transaction_complete(reader, true).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod execution;
pub mod storage;
pub mod tuple;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BufferPoolConfig, DEFAULT_PAGE_SIZE};
pub use common::{Error, PageId, Permissions, Result, TableId, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, StatsSnapshot};
pub use concurrency::{LockManager, LockMode};
pub use storage::page::{Page, PageHeader, PageRef, PageType};
pub use storage::{Catalog, DbFile, DiskManager, HeapFile};

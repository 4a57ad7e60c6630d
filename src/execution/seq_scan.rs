//! Sequential scan operator.

use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Error, Result, TransactionId};
use crate::execution::OpIterator;
use crate::storage::{DbFile, DbFileIterator, HeapFile, HeapFileIterator};
use crate::tuple::{Tuple, TupleDesc};

/// Scans every tuple of a heap file on behalf of one transaction.
///
/// Column names come out qualified as `alias.column`, so a [`crate::execution::Join`]
/// over two scans reports unambiguous join field names.
pub struct SeqScan {
    alias: String,
    desc: Arc<TupleDesc>,
    inner: HeapFileIterator,
    is_open: bool,
}

impl SeqScan {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, file: Arc<HeapFile>, alias: &str) -> Self {
        let desc = Arc::new(file.tuple_desc().with_prefix(alias));
        Self {
            alias: alias.to_string(),
            desc,
            inner: file.iter(pool, tid),
            is_open: false,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(Error::IllegalState(format!("scan {} is not open", self.alias)))
        }
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.inner.open()?;
        self.is_open = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.check_open()?;
        self.inner.has_next()
    }

    fn next(&mut self) -> Result<Tuple> {
        self.check_open()?;
        Ok(self.inner.next()?.with_desc(Arc::clone(&self.desc)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.check_open()?;
        self.inner.rewind()
    }

    fn close(&mut self) {
        self.is_open = false;
        self.inner.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::BufferPoolConfig;
    use crate::storage::Catalog;
    use crate::tuple::{Field, Type};
    use tempfile::tempdir;

    #[test]
    fn test_lifecycle_errors() {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let file = Arc::new(HeapFile::create(dir.path().join("s.dat"), TupleDesc::new(&[Type::Int])).unwrap());
        let table = catalog.add_table(file.clone(), "s");
        let pool = Arc::new(BufferPool::new(BufferPoolConfig::default(), catalog));

        let tid = TransactionId::new();
        let t = Tuple::new(Arc::clone(file.tuple_desc()), vec![Field::Int(7)]).unwrap();
        pool.insert_tuple(tid, table, t).unwrap();

        let mut scan = SeqScan::new(Arc::clone(&pool), tid, file, "s");
        assert!(matches!(scan.has_next(), Err(Error::IllegalState(_))));
        assert!(matches!(scan.next(), Err(Error::IllegalState(_))));
        assert!(matches!(scan.rewind(), Err(Error::IllegalState(_))));
        // A failed rewind must not have opened the scan
        assert!(matches!(scan.has_next(), Err(Error::IllegalState(_))));

        scan.open().unwrap();
        assert_eq!(scan.next().unwrap().field(0).unwrap(), &Field::Int(7));
        assert!(matches!(scan.next(), Err(Error::NoSuchElement(_))));
        scan.rewind().unwrap();
        assert!(scan.has_next().unwrap());

        scan.close();
        assert!(matches!(scan.next(), Err(Error::IllegalState(_))));
        scan.open().unwrap();
        assert!(scan.has_next().unwrap());
    }
}

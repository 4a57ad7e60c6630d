//! Catalog - the registry of tables and their files.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::common::{Error, Result, TableId};
use crate::storage::DbFile;
use crate::tuple::TupleDesc;

struct Table {
    file: Arc<dyn DbFile>,
    name: String,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TableId, Table>,
    by_name: HashMap<String, TableId>,
}

/// Maps table ids and names to their files.
///
/// A file is resolved once when the table is registered; the buffer pool
/// looks pages' files up here by table id.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use stratadb::storage::{Catalog, HeapFile};
/// use stratadb::tuple::{TupleDesc, Type};
///
/// let catalog = Catalog::new();
/// let file = HeapFile::create("users.dat", TupleDesc::named(&[(Type::Int, "id")])).unwrap();
/// let id = catalog.add_table(Arc::new(file), "users");
/// assert_eq!(catalog.table_id("users").unwrap(), id);
/// ```
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`.
    ///
    /// A table already registered with the same name or the same id is
    /// replaced.
    pub fn add_table(&self, file: Arc<dyn DbFile>, name: &str) -> TableId {
        let id = file.id();
        let mut tables = self.tables.write();

        if let Some(old_id) = tables.by_name.remove(name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&id) {
            if old.name != name {
                warn!(table = id.0, old = %old.name, new = name, "table id reused, replacing");
            }
            tables.by_name.remove(&old.name);
        }

        tables.by_name.insert(name.to_string(), id);
        tables.by_id.insert(
            id,
            Table {
                file,
                name: name.to_string(),
            },
        );
        debug!(table = id.0, name, "registered table");
        id
    }

    pub fn file(&self, id: TableId) -> Result<Arc<dyn DbFile>> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .map(|t| Arc::clone(&t.file))
            .ok_or(Error::TableNotFound(id))
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::NoSuchElement(format!("no table named {:?}", name)))
    }

    pub fn table_name(&self, id: TableId) -> Result<String> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .map(|t| t.name.clone())
            .ok_or(Error::TableNotFound(id))
    }

    pub fn tuple_desc(&self, id: TableId) -> Result<Arc<TupleDesc>> {
        Ok(Arc::clone(self.file(id)?.tuple_desc()))
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        *self.tables.write() = Tables::default();
    }
}

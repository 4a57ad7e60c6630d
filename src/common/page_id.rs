//! Page and table identifier types.

use std::fmt;

/// Identifies a table (and the file that stores it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Derive a stable table id from a file path.
    ///
    /// Existing files are hashed by their canonical path, so every spelling
    /// of the same file maps to one id.
    pub fn from_path(path: &std::path::Path) -> Self {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        TableId(crc32fast::hash(canonical.to_string_lossy().as_bytes()))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies a page: the table it belongs to plus its position in the file.
///
/// This is the key of both the page cache and the lock table, so it is
/// compared and hashed by value.
///
/// # Example
/// ```
/// use stratadb::common::{PageId, TableId};
///
/// let pid = PageId::new(TableId(3), 42);
/// assert_eq!(pid.table_id, TableId(3));
/// assert_eq!(pid.page_no, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    #[inline]
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        PageId { table_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id.0, self.page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_page_id_equality_by_value() {
        let a = PageId::new(TableId(1), 2);
        let b = PageId::new(TableId(1), 2);
        assert_eq!(a, b);
        assert_ne!(a, PageId::new(TableId(2), 2));

        let set: HashSet<PageId> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(TableId(1), 9) < PageId::new(TableId(2), 0));
        assert!(PageId::new(TableId(1), 1) < PageId::new(TableId(1), 2));
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(TableId(5), 42)), "Page(5:42)");
    }

    #[test]
    fn test_table_id_from_path_is_stable() {
        let p = std::path::Path::new("/tmp/users.dat");
        assert_eq!(TableId::from_path(p), TableId::from_path(p));
        assert_ne!(
            TableId::from_path(p),
            TableId::from_path(std::path::Path::new("/tmp/orders.dat"))
        );
    }
}

//! Heap file: an unordered table stored as a sequence of slotted pages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::buffer::BufferPool;
use crate::common::config::page_size;
use crate::common::{Error, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::heap::{HeapFileIterator, SlotLayout};
use crate::storage::page::{Page, PageHeader, PageRef, PageType};
use crate::storage::{DbFile, DiskManager};
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// A table file of fixed-width tuples in slotted pages.
///
/// Page bytes on disk always carry a valid checksum; a page that fails
/// verification on read is reported as [`Error::CorruptPage`].
pub struct HeapFile {
    id: TableId,
    path: PathBuf,
    desc: Arc<TupleDesc>,
    layout: SlotLayout,
    disk: Mutex<DiskManager>,
}

impl HeapFile {
    /// Create a new, empty heap file using the current page size.
    pub fn create<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        Self::from_disk(path.as_ref(), desc, DiskManager::create(path.as_ref(), page_size())?)
    }

    /// Open an existing heap file using the current page size.
    pub fn open<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        Self::from_disk(path.as_ref(), desc, DiskManager::open(path.as_ref(), page_size())?)
    }

    pub fn open_or_create<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        Self::from_disk(
            path.as_ref(),
            desc,
            DiskManager::open_or_create(path.as_ref(), page_size())?,
        )
    }

    fn from_disk(path: &Path, desc: TupleDesc, disk: DiskManager) -> Result<Self> {
        let layout = SlotLayout::new(&desc, disk.page_size())?;
        Ok(Self {
            id: disk.table_id(),
            path: path.to_path_buf(),
            desc: Arc::new(desc),
            layout,
            disk: Mutex::new(disk),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn page_size(&self) -> usize {
        self.disk.lock().page_size()
    }

    /// Decode every tuple stored on `page`.
    pub fn tuples_on(&self, page: &Page) -> Result<Vec<Tuple>> {
        if page.header().is_blank() {
            return Ok(Vec::new());
        }
        self.layout.tuples(page.data(), page.id(), &self.desc)
    }

    /// A scan of this file on behalf of `tid`.
    pub fn iter(self: &Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator::new(pool, tid, Arc::clone(self))
    }

    /// Append a fresh, empty heap page and return its id.
    fn append_empty_page(&self) -> Result<PageId> {
        let mut disk = self.disk.lock();
        let mut page = Page::new(PageId::new(self.id, disk.page_count()), disk.page_size());
        self.layout.init(page.data_mut());
        page.update_checksum();

        let page_no = disk.allocate_page(Some(page.data()))?;
        debug!(table = self.id.0, page_no, "appended heap page");
        Ok(PageId::new(self.id, page_no))
    }

    /// Try to place `tuple` on `pid`. Returns the page if it was modified.
    fn try_insert_on(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        pid: PageId,
        tuple: &mut Tuple,
    ) -> Result<Option<PageRef>> {
        let held_before = pool.holds_lock(tid, pid);
        let page_ref = pool.get_page(tid, pid, Permissions::ReadWrite)?;

        let inserted = {
            let mut page = page_ref.write();
            match self.layout.free_slot(page.data()) {
                Some(slot) => {
                    self.layout.write_tuple(page.data_mut(), slot, tuple);
                    tuple.set_record_id(Some(RecordId::new(pid, slot)));
                    true
                }
                None => false,
            }
        };

        if inserted {
            trace!(%pid, %tid, "inserted tuple");
            return Ok(Some(page_ref));
        }
        // Full page, untouched: drop the lock unless it was ours already.
        if !held_before && !page_ref.read().is_dirty() {
            pool.release_page(tid, pid);
        }
        Ok(None)
    }
}

impl DbFile for HeapFile {
    fn id(&self) -> TableId {
        self.id
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    fn read_page(&self, pid: PageId) -> Result<Page> {
        if pid.table_id != self.id {
            return Err(Error::PageNotFound(pid));
        }
        let data = self.disk.lock().read_page(pid.page_no)?;
        let page = Page::from_bytes(pid, data);

        if !page.verify_checksum() {
            return Err(Error::CorruptPage {
                page_id: pid,
                reason: "checksum mismatch".into(),
            });
        }
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let pid = page.id();
        if pid.table_id != self.id {
            return Err(Error::PageNotFound(pid));
        }

        let mut bytes = page.data().to_vec();
        if PageHeader::from_bytes(&bytes).is_blank() {
            PageHeader::new(PageType::Heap).write_to(&mut bytes);
        }
        let checksum = PageHeader::compute_checksum(&bytes);
        bytes[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());

        self.disk.lock().write_page(pid.page_no, &bytes)
    }

    fn num_pages(&self) -> u32 {
        self.disk.lock().page_count()
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        mut tuple: Tuple,
    ) -> Result<Vec<PageRef>> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(Error::SchemaMismatch(format!(
                "tuple ({}) does not match table ({})",
                tuple.tuple_desc(),
                self.desc
            )));
        }

        for page_no in 0..self.num_pages() {
            let pid = PageId::new(self.id, page_no);
            if let Some(page_ref) = self.try_insert_on(pool, tid, pid, &mut tuple)? {
                return Ok(vec![page_ref]);
            }
        }

        let pid = self.append_empty_page()?;
        match self.try_insert_on(pool, tid, pid, &mut tuple)? {
            Some(page_ref) => Ok(vec![page_ref]),
            None => Err(Error::PageFull(pid)),
        }
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| Error::TupleNotFound("tuple has no record id".into()))?;
        if rid.page_id.table_id != self.id || rid.page_id.page_no >= self.num_pages() {
            return Err(Error::TupleNotFound(format!("{} is not in {}", rid, self.id)));
        }
        if rid.slot >= self.layout.num_slots() {
            return Err(Error::TupleNotFound(format!("{} has no such slot", rid)));
        }

        let page_ref = pool.get_page(tid, rid.page_id, Permissions::ReadWrite)?;
        {
            let mut page = page_ref.write();
            if !self.layout.is_used(page.data(), rid.slot) {
                return Err(Error::TupleNotFound(format!("{} is empty", rid)));
            }
            self.layout.clear_slot(page.data_mut(), rid.slot);
        }
        trace!(%rid, %tid, "deleted tuple");

        Ok(vec![page_ref])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::Type;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_page_verifies() {
        let dir = tempdir().unwrap();
        let file =
            HeapFile::create(dir.path().join("t.dat"), TupleDesc::new(&[Type::Int])).unwrap();
        let pid = file.append_empty_page().unwrap();

        let mut page = file.read_page(pid).unwrap();
        page.data_mut()[PageHeader::SIZE + 10] = 0x11;
        file.write_page(&page).unwrap();

        let back = file.read_page(pid).unwrap();
        assert_eq!(back.data()[PageHeader::SIZE + 10], 0x11);
        assert!(back.verify_checksum());
    }

    #[test]
    fn test_corrupt_page_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let file = HeapFile::create(&path, TupleDesc::new(&[Type::Int])).unwrap();
        let pid = file.append_empty_page().unwrap();

        {
            let mut disk = DiskManager::open(&path, file.page_size()).unwrap();
            let mut data = disk.read_page(pid.page_no).unwrap();
            data[100] ^= 0xFF;
            disk.write_page(pid.page_no, &data).unwrap();
        }

        assert!(matches!(
            file.read_page(pid),
            Err(Error::CorruptPage { .. })
        ));
    }

    #[test]
    fn test_foreign_page_rejected() {
        let dir = tempdir().unwrap();
        let file =
            HeapFile::create(dir.path().join("t.dat"), TupleDesc::new(&[Type::Int])).unwrap();
        let other = PageId::new(TableId(file.id().0.wrapping_add(1)), 0);
        assert!(matches!(file.read_page(other), Err(Error::PageNotFound(_))));
    }
}

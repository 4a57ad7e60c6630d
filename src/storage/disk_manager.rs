//! Disk Manager - low-level file I/O for one table's pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating new pages
//! - Managing the table file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, PageId, Result, TableId};

/// Manages disk I/O for a single table file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      size     2×size  ...    N×size
/// ```
///
/// The page size is fixed when the manager is created or opened.
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The owning file wraps it in a mutex.
///
/// # Durability
/// All writes are followed by `fsync()`, which is what makes commit-time
/// flushes durable.
pub struct DiskManager {
    file: File,
    table_id: TableId,
    page_size: usize,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a new table file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        Ok(Self {
            file,
            table_id: TableId::from_path(path.as_ref()),
            page_size,
            page_count: 0,
        })
    }

    /// Open an existing table file.
    ///
    /// A trailing partial page is ignored.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / page_size as u64) as u32;

        Ok(Self {
            file,
            table_id: TableId::from_path(path.as_ref()),
            page_size,
            page_count,
        })
    }

    /// Open an existing table file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, page_size)
        } else {
            Self::create(path, page_size)
        }
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_no: u32) -> Result<Vec<u8>> {
        self.check_bounds(page_no)?;

        self.file.seek(SeekFrom::Start(self.offset(page_no)))?;
        let mut data = vec![0u8; self.page_size];
        self.file.read_exact(&mut data)?;

        Ok(data)
    }

    /// Write a page to disk and `fsync`.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_no: u32, data: &[u8]) -> Result<()> {
        self.check_bounds(page_no)?;
        if data.len() != self.page_size {
            return Err(Error::CorruptPage {
                page_id: self.page_id(page_no),
                reason: format!("expected {} bytes, got {}", self.page_size, data.len()),
            });
        }

        self.file.seek(SeekFrom::Start(self.offset(page_no)))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Append a page holding `data` (zeroes if `None`) and return its number.
    pub fn allocate_page(&mut self, data: Option<&[u8]>) -> Result<u32> {
        let page_no = self.page_count;

        self.file.seek(SeekFrom::Start(self.offset(page_no)))?;
        match data {
            Some(bytes) if bytes.len() == self.page_size => self.file.write_all(bytes)?,
            Some(bytes) => {
                return Err(Error::CorruptPage {
                    page_id: self.page_id(page_no),
                    reason: format!("expected {} bytes, got {}", self.page_size, bytes.len()),
                })
            }
            None => self.file.write_all(&vec![0u8; self.page_size])?,
        }
        self.file.sync_all()?;

        self.page_count += 1;
        Ok(page_no)
    }

    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the total size of the table file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (self.page_size as u64)
    }

    fn page_id(&self, page_no: u32) -> PageId {
        PageId::new(self.table_id, page_no)
    }

    fn offset(&self, page_no: u32) -> u64 {
        (page_no as u64) * (self.page_size as u64)
    }

    fn check_bounds(&self, page_no: u32) -> Result<()> {
        if page_no >= self.page_count {
            return Err(Error::PageNotFound(self.page_id(page_no)));
        }
        Ok(())
    }
}

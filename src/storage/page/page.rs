//! Page - the fixed-size unit of storage, as held by the buffer pool.
//!
//! A [`Page`] is a raw byte block plus the bookkeeping the buffer pool needs
//! for commit and abort:
//! - which transaction (if any) dirtied it
//! - a before-image: the bytes as of the last flush

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{PageId, TransactionId};

use super::page_header::PageHeader;

/// Shared handle to a cached page.
///
/// The buffer pool keeps one `PageRef` per cached page id and hands out
/// clones, so writes through any handle are visible to later readers.
pub type PageRef = Arc<RwLock<Page>>;

/// One page worth of bytes plus dirty and before-image state.
///
/// # Before-image
/// The before-image is an immutable copy of the page as last persisted. It is
/// taken when the page is loaded and refreshed exactly when the page is
/// flushed, so [`Page::rollback`] undoes every write since then.
///
/// # Example
/// ```
/// use stratadb::common::{PageId, TableId, TransactionId};
/// use stratadb::storage::page::Page;
///
/// let mut page = Page::new(PageId::new(TableId(1), 0), 64);
/// let tid = TransactionId::new();
///
/// page.data_mut()[10] = 0xFF;
/// page.mark_dirty(Some(tid));
/// assert_eq!(page.dirtied_by(), Some(tid));
///
/// page.rollback();
/// assert_eq!(page.data()[10], 0);
/// assert!(!page.is_dirty());
/// ```
#[derive(Debug)]
pub struct Page {
    id: PageId,
    data: Box<[u8]>,
    dirty: Option<TransactionId>,
    before_image: Arc<[u8]>,
}

impl Page {
    /// Create a zeroed page of `size` bytes.
    pub fn new(id: PageId, size: usize) -> Self {
        Self::from_bytes(id, vec![0u8; size])
    }

    /// Wrap bytes read from storage. They also become the before-image.
    pub fn from_bytes(id: PageId, bytes: Vec<u8>) -> Self {
        let before_image: Arc<[u8]> = Arc::from(bytes.as_slice());
        Self {
            id,
            data: bytes.into_boxed_slice(),
            dirty: None,
            before_image,
        }
    }

    /// Move this page behind a shared handle.
    pub fn into_ref(self) -> PageRef {
        Arc::new(RwLock::new(self))
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Set or clear the dirty owner.
    #[inline]
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirty = tid;
    }

    /// The transaction that dirtied this page, if it is dirty.
    #[inline]
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirty
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// A clean copy of this page as of the last flush.
    pub fn before_image(&self) -> Page {
        Page {
            id: self.id,
            data: self.before_image.to_vec().into_boxed_slice(),
            dirty: None,
            before_image: Arc::clone(&self.before_image),
        }
    }

    /// Snapshot the current bytes as the new before-image.
    pub fn set_before_image(&mut self) {
        self.before_image = Arc::from(&self.data[..]);
    }

    /// Discard every change since the last flush and clear the dirty flag.
    pub fn rollback(&mut self) {
        self.data.copy_from_slice(&self.before_image);
        self.dirty = None;
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum. Blank pages have none and always pass.
    pub fn verify_checksum(&self) -> bool {
        let header = self.header();
        header.is_blank() || header.verify_checksum(&self.data)
    }
}

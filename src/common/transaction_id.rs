//! Transaction identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a unit of work.
///
/// Used as the lock-table key and as the owner tag of dirty pages. Ids are
/// handed out from a process-wide counter, so two calls to
/// [`TransactionId::new`] never return the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate a fresh transaction id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id. Does not reserve it.
    #[inline]
    pub fn from_raw(id: u64) -> Self {
        TransactionId(id)
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Access requested by [`crate::buffer::BufferPool::get_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    /// Shared lock.
    ReadOnly,
    /// Exclusive lock.
    ReadWrite,
}

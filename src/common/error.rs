//! Error types for stratadb.

use thiserror::Error;

use crate::common::{PageId, TableId, TransactionId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in stratadb.
///
/// Callers are expected to branch on some of these as ordinary outcomes:
/// [`Error::TransactionAborted`] means "abort and retry", and
/// [`Error::NoEvictablePage`] means the pool is saturated with uncommitted
/// writes.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transaction lost a lock conflict (deadlock or lock timeout).
    ///
    /// The caller must run the abort path for `tid`.
    #[error("transaction {tid} aborted: {reason}")]
    TransactionAborted { tid: TransactionId, reason: String },

    /// No cached page is both clean and free of a write guard, so nothing
    /// can be evicted under no-steal.
    #[error("no evictable page: none of {capacity} cached pages is clean and unlocked")]
    NoEvictablePage { capacity: usize },

    /// Requested page does not exist in its file.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// No file is registered for the table.
    #[error("table {0} not found")]
    TableNotFound(TableId),

    /// Page bytes failed validation when read back.
    #[error("{page_id} corrupted: {reason}")]
    CorruptPage { page_id: PageId, reason: String },

    /// No free slot on the page.
    #[error("{0} has no free slot")]
    PageFull(PageId),

    /// The tuple has no record id, or its record id does not name a live slot.
    #[error("tuple not found: {0}")]
    TupleNotFound(String),

    /// A tuple or field does not match the schema it is used with.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// An iterator or schema lookup has nothing to return.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// An operator was used outside its open lifecycle.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl Error {
    pub(crate) fn aborted(tid: TransactionId, reason: impl Into<String>) -> Self {
        Error::TransactionAborted {
            tid,
            reason: reason.into(),
        }
    }

    /// Whether the caller should abort the transaction that hit this error.
    pub fn is_transaction_aborted(&self) -> bool {
        matches!(self, Error::TransactionAborted { .. })
    }
}

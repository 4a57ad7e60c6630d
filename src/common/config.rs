//! Configuration for stratadb.
//!
//! The page size is process-wide. It is read by every component that lays out
//! or allocates pages, and may only be changed by tests (see
//! [`set_page_size`]). Everything else is passed explicitly through
//! [`BufferPoolConfig`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so one page is one aligned I/O.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages cached by a [`crate::buffer::BufferPool`].
pub const DEFAULT_PAGES: usize = 50;

/// Fixed on-page width of the character payload of a string field.
pub const STRING_LEN: usize = 128;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Current page size in bytes.
#[inline]
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Override the page size.
///
/// Only for tests that want tiny pages to exercise multi-page files. Files
/// created before the change keep the size they were created with.
#[doc(hidden)]
pub fn set_page_size(size: usize) {
    assert!(size > 0, "page size must be > 0");
    PAGE_SIZE.store(size, Ordering::Relaxed);
}

/// Restore the default page size.
#[doc(hidden)]
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}

/// Settings for a [`crate::buffer::BufferPool`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use stratadb::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default()
///     .with_max_pages(8)
///     .with_lock_timeout(Some(Duration::from_millis(200)));
/// assert_eq!(config.max_pages, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of pages held in the cache.
    pub max_pages: usize,

    /// Upper bound on a single lock wait.
    ///
    /// Deadlocks are detected through the waits-for graph; the timeout only
    /// catches waits the graph cannot see. `None` waits until granted or
    /// until a cycle is found.
    pub lock_timeout: Option<Duration>,
}

impl BufferPoolConfig {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_PAGES,
            lock_timeout: Some(Duration::from_secs(5)),
        }
    }
}

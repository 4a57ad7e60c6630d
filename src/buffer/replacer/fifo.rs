//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::common::PageId;

/// A FIFO eviction policy over cached pages.
///
/// Pages are ordered by when they first entered the cache. Recording a
/// page that is already tracked does not move it. Pages the caller reports
/// as not evictable keep their position.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Page IDs in insertion order (front = oldest).
    queue: VecDeque<PageId>,

    /// Set for O(1) membership check.
    in_queue: HashSet<PageId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a page entered the cache.
    pub fn record(&mut self, page_id: PageId) {
        if self.in_queue.insert(page_id) {
            self.queue.push_back(page_id);
        }
    }

    /// Remove and return the oldest page for which `is_evictable` holds.
    ///
    /// Returns None if no tracked page qualifies.
    pub fn victim<F>(&mut self, mut is_evictable: F) -> Option<PageId>
    where
        F: FnMut(PageId) -> bool,
    {
        let pos = self.queue.iter().position(|&pid| is_evictable(pid))?;
        let page_id = self.queue.remove(pos)?;
        self.in_queue.remove(&page_id);
        Some(page_id)
    }

    /// Stop tracking a page. Called when a page is discarded.
    pub fn remove(&mut self, page_id: PageId) {
        if self.in_queue.remove(&page_id) {
            self.queue.retain(|&pid| pid != page_id);
        }
    }

    /// Tracked pages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = PageId> + '_ {
        self.queue.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

//! Page-level shared/exclusive locks with deadlock detection.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::common::{Error, PageId, Result, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Holders of one page's lock. Either `shared` is non-empty or `exclusive`
/// is set, never both.
#[derive(Debug, Default)]
struct PageLock {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLock {
    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }

    fn mode_of(&self, tid: TransactionId) -> Option<LockMode> {
        if self.exclusive == Some(tid) {
            Some(LockMode::Exclusive)
        } else if self.shared.contains(&tid) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    /// Transactions whose locks keep `tid` from getting `mode`.
    fn conflicting_holders(&self, tid: TransactionId, mode: LockMode) -> Vec<TransactionId> {
        let mut holders: Vec<TransactionId> = self.exclusive.into_iter().filter(|&h| h != tid).collect();
        if mode == LockMode::Exclusive {
            holders.extend(self.shared.iter().copied().filter(|&h| h != tid));
        }
        holders
    }
}

#[derive(Debug, Default)]
struct LockTable {
    pages: HashMap<PageId, PageLock>,
    held: HashMap<TransactionId, HashSet<PageId>>,
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockTable {
    fn grant(&mut self, tid: TransactionId, pid: PageId, mode: LockMode) {
        let lock = self.pages.entry(pid).or_default();
        match mode {
            LockMode::Shared => {
                lock.shared.insert(tid);
            }
            LockMode::Exclusive => {
                // A sole shared holder upgrades in place.
                lock.shared.remove(&tid);
                lock.exclusive = Some(tid);
            }
        }
        self.held.entry(tid).or_default().insert(pid);
        self.waits_for.remove(&tid);
    }

    fn release(&mut self, tid: TransactionId, pid: PageId) -> bool {
        let Some(lock) = self.pages.get_mut(&pid) else {
            return false;
        };
        let mut released = lock.shared.remove(&tid);
        if lock.exclusive == Some(tid) {
            lock.exclusive = None;
            released = true;
        }
        if lock.is_free() {
            self.pages.remove(&pid);
        }
        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.held.remove(&tid);
            }
        }
        released
    }

    /// Whether following waits-for edges from `tid` leads back to `tid`.
    fn in_cycle(&self, tid: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<TransactionId> = self
            .waits_for
            .get(&tid)
            .map(|edges| edges.iter().copied().collect())
            .unwrap_or_default();

        while let Some(next) = stack.pop() {
            if next == tid {
                return true;
            }
            if !visited.insert(next) {
                continue;
            }
            if let Some(edges) = self.waits_for.get(&next) {
                stack.extend(edges.iter().copied());
            }
        }
        false
    }
}

/// Grants and tracks page locks for transactions.
///
/// Shared locks coexist; an exclusive lock excludes every other holder.
/// A transaction that is the only shared holder of a page can upgrade to
/// exclusive in place. A blocked request records who it waits for; if that
/// closes a cycle in the waits-for graph the requester gives up with
/// [`Error::TransactionAborted`]. An optional timeout bounds every wait.
#[derive(Debug)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    lock_timeout: Option<Duration>,
}

impl LockManager {
    pub fn new(lock_timeout: Option<Duration>) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            lock_timeout,
        }
    }

    /// Acquire a shared lock on `pid`, blocking while another transaction
    /// holds it exclusively.
    pub fn acquire_read_lock(&self, tid: TransactionId, pid: PageId) -> Result<()> {
        self.acquire(tid, pid, LockMode::Shared)
    }

    /// Acquire an exclusive lock on `pid`, blocking while any other
    /// transaction holds any lock on it.
    pub fn acquire_write_lock(&self, tid: TransactionId, pid: PageId) -> Result<()> {
        self.acquire(tid, pid, LockMode::Exclusive)
    }

    fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let deadline = self.lock_timeout.map(|t| Instant::now() + t);
        let mut table = self.table.lock();

        loop {
            let (held, blockers) = match table.pages.get(&pid) {
                Some(lock) => (lock.mode_of(tid), lock.conflicting_holders(tid, mode)),
                None => (None, Vec::new()),
            };

            if held == Some(LockMode::Exclusive) || (held.is_some() && mode == LockMode::Shared) {
                return Ok(());
            }
            if blockers.is_empty() {
                table.grant(tid, pid, mode);
                trace!(%tid, %pid, ?mode, "lock granted");
                return Ok(());
            }

            table.waits_for.insert(tid, blockers.iter().copied().collect());
            if table.in_cycle(tid) {
                table.waits_for.remove(&tid);
                warn!(%tid, %pid, ?mode, "deadlock detected, aborting requester");
                return Err(Error::aborted(tid, format!("deadlock waiting for {}", pid)));
            }

            trace!(%tid, %pid, ?mode, ?blockers, "waiting for lock");
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut table, deadline).timed_out() {
                        table.waits_for.remove(&tid);
                        warn!(%tid, %pid, ?mode, "lock wait timed out");
                        return Err(Error::aborted(tid, format!("timed out waiting for {}", pid)));
                    }
                }
                None => self.released.wait(&mut table),
            }
        }
    }

    /// Release `tid`'s lock on `pid`, if any.
    pub fn release_lock(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        if table.release(tid, pid) {
            trace!(%tid, %pid, "lock released");
            self.released.notify_all();
        }
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_mode(tid, pid).is_some()
    }

    pub fn lock_mode(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        self.table.lock().pages.get(&pid).and_then(|l| l.mode_of(tid))
    }

    /// Drop every lock `tid` holds and forget what it was waiting for.
    pub fn release_all_locks(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tid).unwrap_or_default();
        for pid in &pages {
            table.release(tid, *pid);
        }
        table.waits_for.remove(&tid);
        for edges in table.waits_for.values_mut() {
            edges.remove(&tid);
        }
        trace!(%tid, count = pages.len(), "released all locks");
        self.released.notify_all();
    }

    pub fn locked_pages(&self, tid: TransactionId) -> HashSet<PageId> {
        self.table.lock().held.get(&tid).cloned().unwrap_or_default()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(None)
    }
}

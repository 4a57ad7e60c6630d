//! Query execution.
//!
//! Operators follow a pull-based iterator protocol ([`OpIterator`]): a
//! parent opens its children and pulls tuples from them one at a time.
//!
//! - [`Join`] - hash join on equality, nested-loop join otherwise
//! - [`SeqScan`] - full scan of a heap file through the buffer pool
//! - [`TupleIterator`] - in-memory tuple source
//! - [`Predicate`] / [`JoinPredicate`] - comparisons

mod join;
mod predicate;
mod seq_scan;
mod tuple_iterator;

use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Tuple, TupleDesc};

pub use join::Join;
pub use predicate::{JoinPredicate, Op, Predicate};
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;

/// The operator protocol.
///
/// `open` must be called before `has_next`, `next` or `rewind`. `close`
/// releases whatever `open` built; an operator may be opened again after it.
pub trait OpIterator: Send {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    /// Return the next tuple, or `Error::NoSuchElement` if there is none.
    fn next(&mut self) -> Result<Tuple>;

    /// Restart from the first tuple.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Schema of the tuples this operator returns.
    fn tuple_desc(&self) -> &Arc<TupleDesc>;
}

/// Drain an open operator into a vector.
pub fn collect(op: &mut dyn OpIterator) -> Result<Vec<Tuple>> {
    let mut out = Vec::new();
    while op.has_next()? {
        out.push(op.next()?);
    }
    Ok(out)
}

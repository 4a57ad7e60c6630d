//! Join operator.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::common::{Error, Result};
use crate::execution::{JoinPredicate, Op, OpIterator};
use crate::tuple::{Field, Tuple, TupleDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    Open,
    Closed,
}

/// Joins two child operators on a [`JoinPredicate`].
///
/// The whole result is computed in [`OpIterator::open`] and replayed from
/// memory, so [`OpIterator::rewind`] never touches the children. Each output
/// tuple is the left tuple's fields followed by the right tuple's fields.
///
/// An [`Op::Equals`] predicate runs as a hash join: left tuples are bucketed
/// by join value, then right tuples probe the buckets. Output follows right
/// arrival order, and within one right tuple the order the matching left
/// tuples arrived. Every other operator runs as a nested-loop join, rewinding
/// the right child once per left tuple. Output follows left order, then
/// right order.
///
/// For example, joining `{1, 2, 3}` with `{1, 5, 6}` on equality of the
/// first columns yields `{1, 2, 3, 1, 5, 6}`.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    desc: Arc<TupleDesc>,
    state: State,
    results: Vec<Tuple>,
    cursor: usize,
}

impl Join {
    /// # Errors
    /// `Error::NoSuchElement` if a predicate field index is out of range for
    /// its child's schema.
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Result<Self> {
        let desc = Self::joined_desc(&predicate, left.as_ref(), right.as_ref())?;
        Ok(Self {
            predicate,
            left,
            right,
            desc,
            state: State::Unopened,
            results: Vec::new(),
            cursor: 0,
        })
    }

    fn joined_desc(
        predicate: &JoinPredicate,
        left: &dyn OpIterator,
        right: &dyn OpIterator,
    ) -> Result<Arc<TupleDesc>> {
        let (l, r) = (left.tuple_desc(), right.tuple_desc());
        l.field_type(predicate.field1())?;
        r.field_type(predicate.field2())?;
        Ok(Arc::new(TupleDesc::merge(l, r)))
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    /// Name of the left join field, as the left child reports it.
    pub fn join_field1_name(&self) -> Result<&str> {
        self.left.tuple_desc().field_name(self.predicate.field1())
    }

    /// Name of the right join field, as the right child reports it.
    pub fn join_field2_name(&self) -> Result<&str> {
        self.right.tuple_desc().field_name(self.predicate.field2())
    }

    pub fn children(&self) -> [&dyn OpIterator; 2] {
        [self.left.as_ref(), self.right.as_ref()]
    }

    /// Replace both children. Not allowed while open.
    pub fn set_children(
        &mut self,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Result<()> {
        if self.state == State::Open {
            return Err(Error::IllegalState("cannot replace children of an open join".into()));
        }
        self.desc = Self::joined_desc(&self.predicate, left.as_ref(), right.as_ref())?;
        self.left = left;
        self.right = right;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Unopened => Err(Error::IllegalState("join has not been opened".into())),
            State::Closed => Err(Error::IllegalState("join is closed".into())),
        }
    }

    fn hash_join(&mut self) -> Result<Vec<Tuple>> {
        let (f1, f2) = (self.predicate.field1(), self.predicate.field2());

        let mut buckets: HashMap<Field, Vec<Tuple>> = HashMap::new();
        while self.left.has_next()? {
            let tuple = self.left.next()?;
            let key = tuple.field(f1)?.clone();
            buckets.entry(key).or_default().push(tuple);
        }

        let mut out = Vec::new();
        while self.right.has_next()? {
            let right = self.right.next()?;
            if let Some(matches) = buckets.get(right.field(f2)?) {
                for left in matches {
                    out.push(Tuple::merge(Arc::clone(&self.desc), left, &right));
                }
            }
        }
        Ok(out)
    }

    fn nested_loop_join(&mut self) -> Result<Vec<Tuple>> {
        let mut out = Vec::new();
        while self.left.has_next()? {
            let left = self.left.next()?;
            while self.right.has_next()? {
                let right = self.right.next()?;
                if self.predicate.filter(&left, &right) {
                    out.push(Tuple::merge(Arc::clone(&self.desc), &left, &right));
                }
            }
            self.right.rewind()?;
        }
        Ok(out)
    }
}

impl OpIterator for Join {
    /// Open both children and compute the full result.
    ///
    /// Allowed on a new or closed join; opening an open join is an error.
    fn open(&mut self) -> Result<()> {
        if self.state == State::Open {
            return Err(Error::IllegalState("join is already open".into()));
        }
        self.left.open()?;
        self.right.open()?;

        let hashed = self.predicate.op() == Op::Equals;
        self.results = if hashed {
            self.hash_join()?
        } else {
            self.nested_loop_join()?
        };
        self.cursor = 0;
        self.state = State::Open;

        debug!(rows = self.results.len(), hashed, op = %self.predicate.op(), "join materialized");
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        self.ensure_open()?;
        let tuple = self
            .results
            .get(self.cursor)
            .cloned()
            .ok_or_else(|| Error::NoSuchElement("join has no more tuples".into()))?;
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.right.close();
        self.left.close();
        self.results = Vec::new();
        self.cursor = 0;
        self.state = State::Closed;
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}

//! An operator over tuples held in memory.

use std::sync::Arc;

use crate::common::{Error, Result};
use crate::execution::OpIterator;
use crate::tuple::{Tuple, TupleDesc};

/// Returns a fixed list of tuples in order.
pub struct TupleIterator {
    desc: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    cursor: Option<usize>,
}

impl TupleIterator {
    /// Every tuple must have the schema `desc` (types only).
    pub fn new(desc: Arc<TupleDesc>, tuples: Vec<Tuple>) -> Result<Self> {
        if let Some(bad) = tuples.iter().find(|t| **t.tuple_desc() != *desc) {
            return Err(Error::SchemaMismatch(format!(
                "tuple ({}) does not match ({})",
                bad.tuple_desc(),
                desc
            )));
        }
        Ok(Self {
            desc,
            tuples,
            cursor: None,
        })
    }

    fn cursor(&self) -> Result<usize> {
        self.cursor
            .ok_or_else(|| Error::IllegalState("tuple iterator is not open".into()))
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.cursor()? < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        let pos = self.cursor()?;
        let tuple = self
            .tuples
            .get(pos)
            .cloned()
            .ok_or_else(|| Error::NoSuchElement("tuple iterator exhausted".into()))?;
        self.cursor = Some(pos + 1);
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor()?;
        self.cursor = Some(0);
        Ok(())
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}

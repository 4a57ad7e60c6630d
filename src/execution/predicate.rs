//! Comparison predicates over tuples.

use std::fmt;

use crate::tuple::{Field, Tuple};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    Like,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::NotEquals => "<>",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::Like => "LIKE",
        };
        f.write_str(s)
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: Field) -> Self {
        Self { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Whether `tuple` satisfies the predicate. A missing field never does.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        tuple
            .field(self.field)
            .map(|f| f.compare(self.op, &self.operand))
            .unwrap_or(false)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{} {} {}", self.field, self.op, self.operand)
    }
}

/// Compares a field of a left tuple against a field of a right tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPredicate {
    field1: usize,
    op: Op,
    field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: Op, field2: usize) -> Self {
        Self { field1, op, field2 }
    }

    /// Index of the join field in the left tuple.
    pub fn field1(&self) -> usize {
        self.field1
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// Index of the join field in the right tuple.
    pub fn field2(&self) -> usize {
        self.field2
    }

    /// Whether `left.field1 <op> right.field2` holds.
    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        match (left.field(self.field1), right.field(self.field2)) {
            (Ok(a), Ok(b)) => a.compare(self.op, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{TupleDesc, Type};
    use std::sync::Arc;

    fn row(vals: &[i32]) -> Tuple {
        let desc = Arc::new(TupleDesc::new(&vec![Type::Int; vals.len()]));
        Tuple::new(desc, vals.iter().map(|&v| Field::Int(v)).collect()).unwrap()
    }

    #[test]
    fn test_predicate_filter() {
        let p = Predicate::new(1, Op::GreaterThan, Field::Int(5));
        assert!(p.filter(&row(&[0, 6])));
        assert!(!p.filter(&row(&[0, 5])));
        assert!(!Predicate::new(9, Op::Equals, Field::Int(0)).filter(&row(&[0])));
    }

    #[test]
    fn test_join_predicate_filter() {
        let eq = JoinPredicate::new(0, Op::Equals, 1);
        assert!(eq.filter(&row(&[3, 9]), &row(&[0, 3])));
        assert!(!eq.filter(&row(&[3, 9]), &row(&[3, 0])));

        let lt = JoinPredicate::new(0, Op::LessThan, 0);
        assert!(lt.filter(&row(&[1]), &row(&[2])));
        assert!(!lt.filter(&row(&[2]), &row(&[2])));
    }

    #[test]
    fn test_mixed_types_never_match() {
        let p = Predicate::new(0, Op::NotEquals, Field::from("x"));
        assert!(!p.filter(&row(&[1])));
    }

    #[test]
    fn test_op_display() {
        assert_eq!(Op::GreaterThanOrEq.to_string(), ">=");
        assert_eq!(Predicate::new(2, Op::Like, Field::from("ab")).to_string(), "f2 LIKE ab");
    }
}

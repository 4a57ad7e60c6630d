//! Tuples and record ids.

use std::fmt;
use std::sync::Arc;

use crate::common::{Error, PageId, Result};
use crate::tuple::{Field, TupleDesc};

/// Location of a tuple on disk: page plus slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}

/// A row: a schema plus one value per column.
///
/// Equality compares values only, so tuples read back from disk compare
/// equal to the tuples that were inserted.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Build a tuple, checking the values against the schema.
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != desc.num_fields() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} fields, got {}",
                desc.num_fields(),
                fields.len()
            )));
        }
        for (i, field) in fields.iter().enumerate() {
            let expected = desc.field_type(i)?;
            if field.field_type() != expected {
                return Err(Error::SchemaMismatch(format!(
                    "field {} is {}, schema says {}",
                    i,
                    field.field_type(),
                    expected
                )));
            }
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    /// Concatenate two tuples under an already merged schema.
    ///
    /// `left`'s values occupy `[0, n1)` and `right`'s `[n1, n1 + n2)`.
    pub fn merge(desc: Arc<TupleDesc>, left: &Tuple, right: &Tuple) -> Tuple {
        let mut fields = Vec::with_capacity(left.fields.len() + right.fields.len());
        fields.extend(left.fields.iter().cloned());
        fields.extend(right.fields.iter().cloned());
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn field(&self, i: usize) -> Result<&Field> {
        self.fields
            .get(i)
            .ok_or_else(|| Error::NoSuchElement(format!("field index {} out of bounds", i)))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn set_field(&mut self, i: usize, field: Field) -> Result<()> {
        let expected = self.desc.field_type(i)?;
        if field.field_type() != expected {
            return Err(Error::SchemaMismatch(format!(
                "field {} is {}, got {}",
                i,
                expected,
                field.field_type()
            )));
        }
        self.fields[i] = field;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Reset the schema, keeping the values. Used by scans that rename columns.
    pub(crate) fn with_desc(mut self, desc: Arc<TupleDesc>) -> Tuple {
        self.desc = desc;
        self
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("\t"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::Type;

    fn int_desc(n: usize) -> Arc<TupleDesc> {
        Arc::new(TupleDesc::new(&vec![Type::Int; n]))
    }

    #[test]
    fn test_new_checks_arity_and_types() {
        let desc = int_desc(2);
        assert!(Tuple::new(desc.clone(), vec![Field::Int(1)]).is_err());
        assert!(Tuple::new(desc.clone(), vec![Field::Int(1), Field::from("x")]).is_err());
        assert!(Tuple::new(desc, vec![Field::Int(1), Field::Int(2)]).is_ok());
    }

    #[test]
    fn test_merge_positions() {
        let l = Tuple::new(int_desc(3), vec![1.into(), 2.into(), 3.into()]).unwrap();
        let r = Tuple::new(int_desc(3), vec![1.into(), 5.into(), 6.into()]).unwrap();
        let merged_desc = Arc::new(TupleDesc::merge(l.tuple_desc(), r.tuple_desc()));

        let m = Tuple::merge(merged_desc, &l, &r);
        let values: Vec<Field> = m.fields().to_vec();
        assert_eq!(
            values,
            vec![1.into(), 2.into(), 3.into(), 1.into(), 5.into(), 6.into()]
        );
    }

    #[test]
    fn test_set_field_checks_type() {
        let mut t = Tuple::new(int_desc(1), vec![Field::Int(1)]).unwrap();
        t.set_field(0, Field::Int(9)).unwrap();
        assert_eq!(t.field(0).unwrap(), &Field::Int(9));
        assert!(t.set_field(0, Field::from("nope")).is_err());
        assert!(t.field(3).is_err());
    }

    #[test]
    fn test_display() {
        let t = Tuple::new(int_desc(2), vec![4.into(), 2.into()]).unwrap();
        assert_eq!(t.to_string(), "4\t2");
    }
}

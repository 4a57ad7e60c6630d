//! Tuple schema.

use std::fmt;

use crate::common::{Error, Result};
use crate::tuple::Type;

/// One column of a [`TupleDesc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdItem {
    pub field_type: Type,
    pub field_name: Option<String>,
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.field_type,
            self.field_name.as_deref().unwrap_or("null")
        )
    }
}

/// Ordered list of column types and optional names.
///
/// Two descriptors are equal when they have the same types in the same
/// order; names are ignored.
///
/// # Example
/// ```
/// use stratadb::tuple::{TupleDesc, Type};
///
/// let left = TupleDesc::named(&[(Type::Int, "id"), (Type::Str, "name")]);
/// let right = TupleDesc::new(&[Type::Int]);
/// let joined = TupleDesc::merge(&left, &right);
///
/// assert_eq!(joined.num_fields(), 3);
/// assert_eq!(joined.field_name(1).unwrap(), "name");
/// ```
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Anonymous columns of the given types.
    pub fn new(types: &[Type]) -> Self {
        Self {
            items: types
                .iter()
                .map(|&field_type| TdItem {
                    field_type,
                    field_name: None,
                })
                .collect(),
        }
    }

    /// Named columns.
    pub fn named(columns: &[(Type, &str)]) -> Self {
        Self {
            items: columns
                .iter()
                .map(|&(field_type, name)| TdItem {
                    field_type,
                    field_name: Some(name.to_string()),
                })
                .collect(),
        }
    }

    pub fn from_items(items: Vec<TdItem>) -> Self {
        Self { items }
    }

    /// Concatenate two descriptors: all of `a`'s columns, then all of `b`'s.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut items = Vec::with_capacity(a.items.len() + b.items.len());
        items.extend(a.items.iter().cloned());
        items.extend(b.items.iter().cloned());
        TupleDesc { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[TdItem] {
        &self.items
    }

    /// Name of column `i`; unnamed columns read as `"null"`.
    pub fn field_name(&self, i: usize) -> Result<&str> {
        self.items
            .get(i)
            .map(|item| item.field_name.as_deref().unwrap_or("null"))
            .ok_or_else(|| Error::NoSuchElement(format!("field index {} out of bounds", i)))
    }

    pub fn field_type(&self, i: usize) -> Result<Type> {
        self.items
            .get(i)
            .map(|item| item.field_type)
            .ok_or_else(|| Error::NoSuchElement(format!("field index {} out of bounds", i)))
    }

    /// Index of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.field_name.as_deref() == Some(name))
            .ok_or_else(|| Error::NoSuchElement(format!("no field named {:?}", name)))
    }

    /// Serialized width in bytes of one tuple with this schema.
    pub fn byte_size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    /// Copy of this descriptor with every named column prefixed by `alias.`.
    pub fn with_prefix(&self, alias: &str) -> TupleDesc {
        TupleDesc {
            items: self
                .items
                .iter()
                .map(|item| TdItem {
                    field_type: item.field_type,
                    field_name: Some(format!(
                        "{}.{}",
                        alias,
                        item.field_name.as_deref().unwrap_or("null")
                    )),
                })
                .collect(),
        }
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.items.iter().map(|item| item.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

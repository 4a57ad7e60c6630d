//! Field values and their on-page types.

use std::fmt;

use crate::common::config::STRING_LEN;
use crate::common::{Error, Result};
use crate::execution::Op;

/// Type of a column.
///
/// Every type has a fixed on-page width so that a heap page can hold a fixed
/// number of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer.
    Int,
    /// String of at most [`STRING_LEN`] bytes.
    Str,
}

impl Type {
    /// Width in bytes of a serialized value of this type.
    pub const fn byte_len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str => 4 + STRING_LEN,
        }
    }

    /// Decode a value of this type from exactly [`Type::byte_len`] bytes.
    pub fn parse(&self, bytes: &[u8]) -> Result<Field> {
        if bytes.len() < self.byte_len() {
            return Err(Error::SchemaMismatch(format!(
                "{:?} needs {} bytes, got {}",
                self,
                self.byte_len(),
                bytes.len()
            )));
        }
        match self {
            Type::Int => Ok(Field::Int(i32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            Type::Str => {
                let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
                if len > STRING_LEN {
                    return Err(Error::SchemaMismatch(format!(
                        "string length {} exceeds {}",
                        len, STRING_LEN
                    )));
                }
                let s = String::from_utf8(bytes[4..4 + len].to_vec())
                    .map_err(|e| Error::SchemaMismatch(format!("string is not UTF-8: {}", e)))?;
                Ok(Field::Str(s))
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Str => write!(f, "STRING"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::Str,
        }
    }

    /// Serialize into `out`, which must be exactly [`Type::byte_len`] bytes long.
    ///
    /// Strings longer than [`STRING_LEN`] bytes are truncated at the last
    /// character boundary that fits.
    pub fn serialize(&self, out: &mut [u8]) {
        match self {
            Field::Int(v) => out[..4].copy_from_slice(&v.to_be_bytes()),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                let mut len = bytes.len().min(STRING_LEN);
                while !s.is_char_boundary(len) {
                    len -= 1;
                }
                out[..4].copy_from_slice(&(len as u32).to_be_bytes());
                out[4..4 + len].copy_from_slice(&bytes[..len]);
                out[4 + len..4 + STRING_LEN].fill(0);
            }
        }
    }

    /// Evaluate `self <op> other`.
    ///
    /// Fields of different types never satisfy any operator. `Like` is a
    /// substring test on strings and plain equality on integers.
    pub fn compare(&self, op: Op, other: &Field) -> bool {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => match op {
                Op::Equals | Op::Like => a == b,
                Op::NotEquals => a != b,
                Op::GreaterThan => a > b,
                Op::GreaterThanOrEq => a >= b,
                Op::LessThan => a < b,
                Op::LessThanOrEq => a <= b,
            },
            (Field::Str(a), Field::Str(b)) => match op {
                Op::Equals => a == b,
                Op::NotEquals => a != b,
                Op::GreaterThan => a > b,
                Op::GreaterThanOrEq => a >= b,
                Op::LessThan => a < b,
                Op::LessThanOrEq => a <= b,
                Op::Like => a.contains(b.as_str()),
            },
            _ => false,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Str(s.to_string())
    }
}

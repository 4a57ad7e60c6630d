//! Tuple model: column types, values, schemas and rows.

mod field;
#[allow(clippy::module_inception)]
mod tuple;
mod tuple_desc;

pub use field::{Field, Type};
pub use tuple::{RecordId, Tuple};
pub use tuple_desc::{TdItem, TupleDesc};

//! Common types and utilities shared across stratadb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and the buffer pool config
//! - Error types
//! - Identifiers (PageId, TableId, TransactionId) and access permissions

pub mod config;
pub mod error;
mod page_id;
mod transaction_id;

pub use error::{Error, Result};
pub use page_id::{PageId, TableId};
pub use transaction_id::{Permissions, TransactionId};

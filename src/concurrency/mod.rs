//! Concurrency control.
//!
//! - [`LockManager`] - page-level shared/exclusive locks held until a
//!   transaction completes

mod lock_manager;

pub use lock_manager::{LockManager, LockMode};

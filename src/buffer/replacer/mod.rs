//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`FifoReplacer`] - oldest-first, skipping pages that must stay cached

mod fifo;

pub use fifo::FifoReplacer;

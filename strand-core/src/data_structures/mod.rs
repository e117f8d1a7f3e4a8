//! Data structures for concurrent collections.
//!
//! # Organization
//!
//! - [`ordered`] - Tombstoning linked list with lock-free reads

pub mod ordered;

pub use ordered::{ConcurrentOrderedList, Iter, OrderFn, OrderRule};

//! Concurrent ordered (or newest-first) singly-linked list.
//!
//! Readers never lock. Writers serialize on one mutex for every structural
//! change. Deletion is logical until `purge`.

mod concurrent_ordered_list;
mod iter;
mod node;

pub use concurrent_ordered_list::{ConcurrentOrderedList, OrderFn, OrderRule};
pub use iter::Iter;

//! Epoch-based reclamation for strand lists.
//!
//! [`EpochGuard`] plugs crossbeam-epoch into
//! [`strand_core::ConcurrentOrderedList`], so purged nodes are freed once no
//! reader can still reach them instead of when the list drops.
//!
//! ```ignore
//! use strand_crossbeam::EpochOrderedList;
//!
//! let list: EpochOrderedList<i32> = EpochOrderedList::sorted();
//! list.add(42);
//! list.remove(&42);
//! list.purge();
//! ```

pub mod epoch_guard;

pub use epoch_guard::{EpochGuard, EpochRef};

/// A [`ConcurrentOrderedList`](strand_core::ConcurrentOrderedList) reclaiming
/// through the global epoch collector.
///
/// The collector may drop purged elements on any thread after the list is
/// gone, so elements that borrow cannot be purged:
///
/// ```compile_fail
/// use std::sync::Mutex;
/// use strand_crossbeam::EpochOrderedList;
///
/// struct Tracker<'a> {
///     id: i32,
///     log: &'a Mutex<Vec<i32>>,
/// }
///
/// impl Drop for Tracker<'_> {
///     fn drop(&mut self) {
///         self.log.lock().unwrap().push(self.id);
///     }
/// }
///
/// let log = Mutex::new(Vec::new());
/// {
///     let list: EpochOrderedList<Tracker<'_>> = EpochOrderedList::new();
///     list.add(Tracker { id: 1, log: &log });
///     list.delete(|t| t.id == 1, false);
///     list.purge();
/// }
/// ```
pub type EpochOrderedList<T> = strand_core::ConcurrentOrderedList<T, EpochGuard>;

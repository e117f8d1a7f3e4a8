//! Guard trait for memory reclamation strategies.
//!
//! [`ConcurrentOrderedList`](crate::ConcurrentOrderedList) readers walk the
//! chain without taking the writer lock, so a node unlinked by `purge` or
//! `clear` may still be under a reader's feet. The `Guard` trait decides when
//! such a node's memory can actually be released.
//!
//! ```text
//! ConcurrentOrderedList<T, G: Guard>
//!     │
//!     ├── ConcurrentOrderedList<T, EpochGuard>     (production, strand-crossbeam)
//!     └── ConcurrentOrderedList<T, DeferredGuard>  (testing)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use strand_core::ConcurrentOrderedList;
//! use strand_crossbeam::EpochGuard;
//!
//! let list: ConcurrentOrderedList<i32, EpochGuard> = ConcurrentOrderedList::sorted();
//! list.add(42);
//! list.remove(&42);
//! list.purge();
//! ```

mod deferred_guard;

use std::ops::Deref;

pub use deferred_guard::{DeferredGuard, DeferredRef};

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// - **EpochGuard**: Low overhead, batched reclamation (crossbeam-epoch)
/// - **DeferredGuard**: Holds every retired node until the guard drops (testing)
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. Nodes passed to `defer_destroy` are not freed while any `ReadGuard`
///    pinned before the call is still alive
/// 2. `GuardedRef` keeps the referenced data valid for its lifetime
///
/// The guard stored in a list only schedules destruction. Pinning happens
/// per operation through [`Guard::pin`]. Guards are `'static` so that order
/// rules built inside generic code can be boxed.
///
pub trait Guard: Sized + Default + Send + Sync + 'static {
    /// A reference protected by a guard of this type.
    ///
    type GuardedRef<'a, T: 'a>: Deref<Target = T>;

    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards this is a pinned `crossbeam_epoch::Guard`.
    /// For deferred guards it is `()`, since nothing is freed before the
    /// list itself drops.
    ///
    type ReadGuard: Sized;

    /// Pin an active read guard.
    ///
    /// Every traversal that runs outside the writer lock holds one of these
    /// from before it loads `head` until it stops touching nodes.
    ///
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must be a valid pointer previously allocated by the list
    /// - `node` must be unlinked (no longer reachable from `head`)
    /// - `node` must not be passed here more than once
    /// - `dealloc` must be the correct deallocation function for `node`
    ///
    /// `N: Send + 'static` because `dealloc` may run on another thread, after
    /// the list and anything its elements borrowed are gone.
    ///
    unsafe fn defer_destroy<N: Send + 'static>(
        &self,
        node: *mut N,
        dealloc: unsafe fn(*mut N),
    );

    /// Create a guarded reference from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to valid data protected by a guard that is still
    ///   pinned when this is called
    /// - The data must remain valid for lifetime `'a`
    ///
    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T>;
}

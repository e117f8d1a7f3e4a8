//! Deferred guard implementation for testing.
//!
//! `DeferredGuard` keeps every node retired by `purge` or `clear` alive until
//! the guard (and so the owning list) is dropped.

use std::collections::HashSet;
use std::ops::Deref;

use parking_lot::Mutex;

use super::Guard;

/// A guard that defers all node destruction until it is dropped.
///
/// Destruction timing is fully predictable, which makes it the guard of
/// choice for tests. Memory grows with every purge, so long-running code
/// should use `EpochGuard` instead.
///
/// In debug builds retiring the same node twice panics immediately.
///
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: only the pointer and its deallocation function are stored, and
// access goes through the Mutex.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of nodes waiting for the guard to drop.
    pub fn pending(&self) -> usize {
        self.deferred.lock().len()
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let nodes = self.deferred.get_mut();

        let mut seen: HashSet<usize> = HashSet::with_capacity(nodes.len());
        let duplicates = nodes
            .iter()
            .filter(|node| !seen.insert(node.ptr as usize))
            .count();
        if duplicates > 0 {
            panic!(
                "found {} duplicate pointer(s) among {} deferred nodes",
                duplicates,
                nodes.len()
            );
        }

        for node in nodes.drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

/// Reference handed out by `DeferredGuard`.
///
/// Nothing is freed before the list drops, so the plain borrow is enough.
///
pub struct DeferredRef<'a, T> {
    data: &'a T,
}

impl<'a, T> DeferredRef<'a, T> {
    pub fn new(data: &'a T) -> Self {
        DeferredRef { data }
    }
}

impl<T> Deref for DeferredRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DeferredRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeferredRef({:?})", self.data)
    }
}

impl Guard for DeferredGuard {
    type GuardedRef<'a, T: 'a> = DeferredRef<'a, T>;

    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N: Send + 'static>(
        &self,
        node: *mut N,
        dealloc: unsafe fn(*mut N),
    ) {
        #[cfg(debug_assertions)]
        {
            let addr = node as usize;
            if !self.seen.lock().insert(addr) {
                panic!("node {:#x} retired twice", addr);
            }
        }

        let node = DeferredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred.lock().push(node);
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        // Safety: caller guarantees ptr is valid for lifetime 'a
        DeferredRef::new(unsafe { &*ptr })
    }
}

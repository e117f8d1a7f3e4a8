use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

pub(crate) type NodePtr<T> = *mut Node<T>;

/// Lifecycle of a list node.
///
/// ```text
///            delete            purge
///   Valid ──────────► Deleted ──────────► Purged
///     ▲                  │
///     └──────────────────┘
///          undelete
/// ```
///
/// `clear` is the one writer allowed to jump straight from `Valid` to
/// `Purged`. Nothing leaves `Purged`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum NodeState {
    Valid = 0,
    Deleted = 1,
    Purged = 2,
}

impl NodeState {
    #[inline]
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => NodeState::Valid,
            1 => NodeState::Deleted,
            _ => NodeState::Purged,
        }
    }

    /// Whether `self -> to` is a step `delete`, `undelete` or `purge` may take.
    pub(crate) fn can_transition_to(self, to: NodeState) -> bool {
        matches!(
            (self, to),
            (NodeState::Valid, NodeState::Deleted)
                | (NodeState::Deleted, NodeState::Valid)
                | (NodeState::Deleted, NodeState::Purged)
        )
    }
}

/// A list cell.
///
/// `value` never changes after construction. `next` and `state` are written
/// only by the holder of the list's writer lock and read by anyone.
///
#[derive(Debug)]
pub(crate) struct Node<T> {
    value: T,
    next: AtomicPtr<Node<T>>,
    state: AtomicU8,
}

impl<T> Node<T> {
    fn new(value: T) -> Self {
        Node {
            value,
            next: AtomicPtr::new(ptr::null_mut()),
            state: AtomicU8::new(NodeState::Valid as u8),
        }
    }

    /// Allocate a `Valid`, unlinked node. It becomes a raw pointer only
    /// once it is linked.
    pub(crate) fn boxed(value: T) -> Box<Self> {
        Box::new(Node::new(value))
    }

    #[inline]
    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// Load state (Acquire ordering)
    #[inline]
    pub(crate) fn state(&self) -> NodeState {
        NodeState::from_raw(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.state() == NodeState::Valid
    }

    /// Store state (Release ordering). Writer lock must be held.
    #[inline]
    pub(crate) fn set_state(&self, state: NodeState) {
        self.state.store(state as u8, Ordering::Release)
    }

    /// Move `from -> to` if the node is currently in `from`.
    ///
    /// Writer lock must be held, so the load/store pair cannot interleave
    /// with another writer.
    pub(crate) fn transition(&self, from: NodeState, to: NodeState) -> bool {
        debug_assert!(
            from.can_transition_to(to),
            "illegal node transition {:?} -> {:?}",
            from,
            to
        );

        if self.state() != from {
            return false;
        }
        self.set_state(to);
        true
    }

    // =========================================================================
    // Next pointer accessors
    // =========================================================================

    /// Load next pointer (Acquire ordering)
    #[inline]
    pub(crate) fn get_next(&self) -> NodePtr<T> {
        self.next.load(Ordering::Acquire)
    }

    /// Store next pointer (Release ordering). Writer lock must be held.
    #[inline]
    pub(crate) fn set_next(&self, next: NodePtr<T>) {
        self.next.store(next, Ordering::Release)
    }

    /// Free a node allocated by [`Node::boxed`] and leaked into the chain.
    ///
    /// # Safety
    /// - `ptr` must come from `Node::boxed` and be freed only once
    /// - no thread may touch the node afterwards
    pub(crate) unsafe fn dealloc_ptr(ptr: *mut Self) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

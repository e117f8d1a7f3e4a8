use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::iter::Iter;
use super::node::{Node, NodePtr, NodeState};
use crate::error::{CopyError, Result};
use crate::guard::Guard;

/// Comparator deciding where `add` places a value.
pub type OrderFn<T> = dyn Fn(&T, &T) -> CmpOrdering + Send + Sync;

/// Owned comparator stored by an ordered list.
pub type OrderRule<T> = Box<OrderFn<T>>;

///
/// Singly-linked list with lock-free readers and a single serialized writer.
///
/// Elements are tombstoned by `delete`, restored by `undelete` and physically
/// unlinked only by `purge` / `clear`. Without an order rule new elements go
/// to the front (newest first); with one the chain is kept ascending.
///
// =============================================================================
// LIST INVARIANTS
// =============================================================================
//
//  head ──► [3 V] ──► [5 D] ──► [7 V] ──► null
//                       │
//                    tombstone (still linked, skipped by readers)
//
// 1. Following next from head reaches only Valid or Deleted nodes.
//    Every node that is not Purged is linked; every Purged node is not.
// 2. With an order rule, the linked chain is ascending by that rule,
//    tombstones included.
// 3. State moves Valid -> Deleted -> Valid ... -> Deleted -> Purged;
//    clear alone may go Valid -> Purged.
// 4. head, next and state are written only under `writer`.
//
// =============================================================================
// SORTED ADD
// =============================================================================
//
// Phase 1 (unlocked): walk from head to the last node that does not sort
//                     after the new value. Tombstones count as positions.
// Phase 2 (locked):   writers may have inserted in the meantime, so walk
//                     forward again from that predecessor.
// Phase 3 (locked):   if the predecessor was purged between the phases it is
//                     off the chain; splicing after it would lose the new
//                     node. Drop the lock and start again from phase 1.
//
//  pred(Purged) ──► x         head ──► a ──► b
//        ▲                             (pred no longer reachable)
//   stale pointer from phase 1
//
// =============================================================================
//
// Reclamation: a purged node can still be under a reader or a phase 1 scan.
// Purge/clear hand it to the guard after unlinking, and everything that walks
// the chain outside the lock holds `G::pin()` for its whole walk.
//
pub struct ConcurrentOrderedList<T, G: Guard> {
    head: AtomicPtr<Node<T>>,
    order: Option<OrderRule<T>>,
    writer: Mutex<()>,
    /// Receives every node turned Purged.
    guard: G,
    _marker: PhantomData<T>,
}

/// Result of the locked half of a sorted add.
///
/// The node stays boxed until it is linked, so a panicking order rule frees it.
enum SpliceOutcome<T> {
    Inserted,
    RetryNeeded(Box<Node<T>>),
}

impl<T, G: Guard> ConcurrentOrderedList<T, G> {
    /// Create a list that adds at the front.
    pub fn new() -> Self {
        Self::from_rule(None)
    }

    /// Create a list kept ascending by `rule`.
    ///
    /// Equal elements end up adjacent in unspecified relative order.
    pub fn with_order<F>(rule: F) -> Self
    where
        F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
    {
        Self::from_rule(Some(Box::new(rule)))
    }

    fn from_rule(order: Option<OrderRule<T>>) -> Self {
        ConcurrentOrderedList {
            head: AtomicPtr::new(ptr::null_mut()),
            order,
            writer: Mutex::new(()),
            guard: G::default(),
            _marker: PhantomData,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    pub fn guard(&self) -> &G {
        &self.guard
    }

    /// First node of the chain. Caller must be pinned.
    #[inline]
    pub(crate) fn first_node(&self) -> NodePtr<T> {
        self.head.load(Ordering::Acquire)
    }

    // =========================================================================
    // Add
    // =========================================================================

    /// Link a new `Valid` element into the list.
    ///
    /// Never fails and never rejects duplicates.
    pub fn add(&self, value: T) {
        let new_node = Node::boxed(value);

        match self.order.as_deref() {
            None => self.push_front(new_node),
            Some(order) => {
                let _guard = G::pin();
                self.insert_sorted(new_node, order);
            }
        }
    }

    fn push_front(&self, new_node: Box<Node<T>>) {
        let _lock = self.writer.lock();
        new_node.set_next(self.head.load(Ordering::Acquire));
        self.head.store(Box::into_raw(new_node), Ordering::Release);
    }

    fn insert_sorted(&self, mut new_node: Box<Node<T>>, order: &OrderFn<T>) {
        let mut retries = 0usize;

        loop {
            let pred = self.locate_predecessor(new_node.value(), order);

            match self.splice_after(new_node, pred, order) {
                SpliceOutcome::Inserted => return,
                SpliceOutcome::RetryNeeded(node) => {
                    new_node = node;
                    retries += 1;
                    trace!(retries, "insertion point was purged, rescanning");
                }
            }
        }
    }

    /// Unlocked scan for the node the new value goes after.
    ///
    /// Returns null when the value belongs in front of `head`.
    fn locate_predecessor(&self, value: &T, order: &OrderFn<T>) -> NodePtr<T> {
        let head = self.head.load(Ordering::Acquire);
        if head.is_null() || order(value, unsafe { (*head).value() }).is_lt() {
            return ptr::null_mut();
        }

        unsafe { Self::skip_not_after(head, value, order) }
    }

    /// Advance from `pred` while its successor does not sort after `value`.
    ///
    /// # Safety
    /// `pred` must be non-null and protected by a pin or the writer lock.
    unsafe fn skip_not_after(
        mut pred: NodePtr<T>,
        value: &T,
        order: &OrderFn<T>,
    ) -> NodePtr<T> {
        loop {
            let next = unsafe { (*pred).get_next() };
            if next.is_null() || order(value, unsafe { (*next).value() }).is_lt() {
                return pred;
            }
            pred = next;
        }
    }

    /// Locked validation and splice for a sorted add.
    fn splice_after(
        &self,
        new_node: Box<Node<T>>,
        pred: NodePtr<T>,
        order: &OrderFn<T>,
    ) -> SpliceOutcome<T> {
        let _lock = self.writer.lock();
        let value = new_node.value();

        let pred = if pred.is_null() {
            let head = self.head.load(Ordering::Acquire);
            if head.is_null() || order(value, unsafe { (*head).value() }).is_lt() {
                new_node.set_next(head);
                self.head.store(Box::into_raw(new_node), Ordering::Release);
                return SpliceOutcome::Inserted;
            }
            head
        } else {
            pred
        };

        // Writers that ran between the scan and the lock may have inserted
        // values that the new one sorts after.
        let pred = unsafe { Self::skip_not_after(pred, value, order) };

        unsafe {
            if (*pred).state() == NodeState::Purged {
                return SpliceOutcome::RetryNeeded(new_node);
            }
            new_node.set_next((*pred).get_next());
            (*pred).set_next(Box::into_raw(new_node));
        }
        SpliceOutcome::Inserted
    }

    // =========================================================================
    // Delete / Undelete
    // =========================================================================

    /// Tombstone `Valid` elements matching `predicate`.
    ///
    /// Returns how many were flipped; with `only_first` that is at most 1.
    pub fn delete<P>(&self, predicate: P, only_first: bool) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        self.flip_where(predicate, only_first, NodeState::Valid, NodeState::Deleted)
    }

    /// Restore tombstoned elements matching `predicate`.
    ///
    /// Returns how many were flipped; with `only_first` that is at most 1.
    pub fn undelete<P>(&self, predicate: P, only_first: bool) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        self.flip_where(predicate, only_first, NodeState::Deleted, NodeState::Valid)
    }

    /// Tombstone the first element equal to `value`.
    pub fn remove(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.delete(|candidate| candidate == value, true) == 1
    }

    // The lock is taken per matching node, not for the scan. State is checked
    // again under the lock since another writer may have flipped it.
    fn flip_where<P>(
        &self,
        mut predicate: P,
        only_first: bool,
        from: NodeState,
        to: NodeState,
    ) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let _guard = G::pin();
        let mut flipped = 0;
        let mut curr = self.head.load(Ordering::Acquire);

        while !curr.is_null() {
            let node = unsafe { &*curr };

            if node.state() == from && predicate(node.value()) {
                let _lock = self.writer.lock();
                if node.transition(from, to) {
                    flipped += 1;
                    if only_first {
                        break;
                    }
                }
            }

            curr = node.get_next();
        }

        if flipped > 0 {
            debug!(flipped, ?to, "flipped node state");
        }
        flipped
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Walk the chain without locking, calling `visit` on each element that is
    /// `Valid` when reached. Stops at the first `Break`.
    fn visit_valid<B, F>(&self, mut visit: F) -> Option<B>
    where
        F: FnMut(&T) -> ControlFlow<B>,
    {
        let _guard = G::pin();
        let mut curr = self.head.load(Ordering::Acquire);

        while !curr.is_null() {
            let node = unsafe { &*curr };
            if node.is_valid() {
                if let ControlFlow::Break(result) = visit(node.value()) {
                    return Some(result);
                }
            }
            curr = node.get_next();
        }
        None
    }

    /// Number of `Valid` elements seen by one traversal. O(n).
    pub fn len(&self) -> usize {
        self.count_where(|_| true)
    }

    pub fn is_empty(&self) -> bool {
        self.visit_valid(|_| ControlFlow::Break(())).is_none()
    }

    /// Number of `Valid` elements matching `predicate`.
    pub fn count_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let mut count = 0;
        self.visit_valid(|value| {
            if predicate(value) {
                count += 1;
            }
            ControlFlow::<()>::Continue(())
        });
        count
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.visit_valid(|candidate| {
            if candidate == value {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .is_some()
    }

    /// First `Valid` element matching `predicate`, in chain order.
    pub fn find<P>(&self, mut predicate: P) -> Option<G::GuardedRef<'_, T>>
    where
        P: FnMut(&T) -> bool,
    {
        let _guard = G::pin();
        let found = self.visit_valid(|value| {
            if predicate(value) {
                ControlFlow::Break(value as *const T)
            } else {
                ControlFlow::Continue(())
            }
        })?;

        // Safety: `_guard` is still pinned, make_ref takes its own protection
        unsafe { Some(G::make_ref(found)) }
    }

    /// Clone every `Valid` element, in chain order.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.snapshot_where(|_| true)
    }

    /// Clone the `Valid` elements matching `predicate`, in chain order.
    ///
    /// Returns an empty vector when nothing matches.
    pub fn snapshot_where<P>(&self, mut predicate: P) -> Vec<T>
    where
        T: Clone,
        P: FnMut(&T) -> bool,
    {
        let mut result = Vec::new();
        self.visit_valid(|value| {
            if predicate(value) {
                result.push(value.clone());
            }
            ControlFlow::<()>::Continue(())
        });
        result
    }

    /// Clone the `Valid` elements into `dest` starting at `offset`.
    ///
    /// Returns the number written. Elements copied before a capacity error
    /// stay in `dest`.
    pub fn copy_to(&self, dest: &mut [T], offset: usize) -> Result<usize>
    where
        T: Clone,
    {
        if offset > dest.len() {
            return Err(CopyError::OffsetOutOfRange {
                offset,
                len: dest.len(),
            });
        }

        let capacity = dest.len() - offset;
        let mut slots = dest[offset..].iter_mut();
        let mut written = 0;

        let overflow = self.visit_valid(|value| match slots.next() {
            Some(slot) => {
                slot.clone_from(value);
                written += 1;
                ControlFlow::Continue(())
            }
            None => ControlFlow::Break(()),
        });

        match overflow {
            Some(()) => Err(CopyError::InsufficientCapacity { capacity }),
            None => Ok(written),
        }
    }

    /// Iterate over clones of the `Valid` elements.
    ///
    /// The iterator pins a read guard for its whole lifetime.
    pub fn iter(&self) -> Iter<'_, T, G> {
        Iter::new(self)
    }
}

impl<T: Send + 'static, G: Guard> ConcurrentOrderedList<T, G> {
    // =========================================================================
    // Purge / Clear
    // =========================================================================

    /// Unlink every tombstoned element and mark it `Purged`.
    ///
    /// Holds the writer lock for the whole pass. Returns the number of nodes
    /// removed from the chain.
    ///
    /// Purged elements are dropped by the guard, possibly on another thread
    /// and after the list itself, so they must be `Send + 'static`:
    ///
    /// ```compile_fail
    /// use std::rc::Rc;
    /// use strand_core::{ConcurrentOrderedList, DeferredGuard};
    ///
    /// let list: ConcurrentOrderedList<Rc<i32>, DeferredGuard> = ConcurrentOrderedList::new();
    /// list.add(Rc::new(1));
    /// list.purge();
    /// ```
    pub fn purge(&self) -> usize {
        let _lock = self.writer.lock();
        let mut purged = 0;

        unsafe {
            let mut head = self.head.load(Ordering::Acquire);
            while !head.is_null() && (*head).state() == NodeState::Deleted {
                let next = (*head).get_next();
                (*head).transition(NodeState::Deleted, NodeState::Purged);
                self.head.store(next, Ordering::Release);
                self.retire(head);
                purged += 1;
                head = next;
            }

            let mut curr = head;
            while !curr.is_null() {
                let next = (*curr).get_next();
                if !next.is_null() && (*next).state() == NodeState::Deleted {
                    (*next).transition(NodeState::Deleted, NodeState::Purged);
                    (*curr).set_next((*next).get_next());
                    self.retire(next);
                    purged += 1;
                } else {
                    curr = next;
                }
            }
        }

        if purged > 0 {
            debug!(purged, "purged tombstoned nodes");
        }
        purged
    }

    /// Unlink every element, valid or not.
    ///
    /// ```compile_fail
    /// use std::sync::Mutex;
    /// use strand_core::{ConcurrentOrderedList, DeferredGuard};
    ///
    /// let log = Mutex::new(Vec::<i32>::new());
    /// let list: ConcurrentOrderedList<&Mutex<Vec<i32>>, DeferredGuard> =
    ///     ConcurrentOrderedList::new();
    /// list.add(&log);
    /// list.clear();
    /// ```
    pub fn clear(&self) {
        let _lock = self.writer.lock();
        let mut curr = self.head.swap(ptr::null_mut(), Ordering::AcqRel);
        let mut cleared = 0usize;

        while !curr.is_null() {
            unsafe {
                let next = (*curr).get_next();
                // Skips Deleted on purpose: clear is the one Valid -> Purged path.
                (*curr).set_state(NodeState::Purged);
                self.retire(curr);
                curr = next;
            }
            cleared += 1;
        }

        debug!(cleared, "cleared list");
    }

    /// Hand an unlinked, purged node to the guard.
    ///
    /// # Safety
    /// `node` must be Purged, unreachable from `head`, and retired only once.
    unsafe fn retire(&self, node: NodePtr<T>) {
        debug_assert_eq!(unsafe { (*node).state() }, NodeState::Purged);
        unsafe { self.guard.defer_destroy(node, Node::dealloc_ptr) };
    }
}

impl<T: Ord + 'static, G: Guard> ConcurrentOrderedList<T, G> {
    /// Create a list kept ascending by `T`'s own ordering.
    pub fn sorted() -> Self {
        Self::with_order(|a: &T, b: &T| a.cmp(b))
    }
}

impl<T, G: Guard> Default for ConcurrentOrderedList<T, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Clone, G: Guard> IntoIterator for &'a ConcurrentOrderedList<T, G> {
    type Item = T;
    type IntoIter = Iter<'a, T, G>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, G: Guard> fmt::Debug for ConcurrentOrderedList<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = f.debug_list();
        self.visit_valid(|value| {
            entries.entry(value);
            ControlFlow::<()>::Continue(())
        });
        entries.finish()
    }
}

impl<T, G: Guard> Drop for ConcurrentOrderedList<T, G> {
    fn drop(&mut self) {
        // Purged nodes belong to the guard; only the live chain is freed here.
        let mut curr = *self.head.get_mut();

        while !curr.is_null() {
            unsafe {
                debug_assert_ne!(
                    (*curr).state(),
                    NodeState::Purged,
                    "purged node still linked at drop"
                );
                let next = (*curr).get_next();
                Node::dealloc_ptr(curr);
                curr = next;
            }
        }
    }
}

unsafe impl<T: Send, G: Guard> Send for ConcurrentOrderedList<T, G> {}
unsafe impl<T: Send + Sync, G: Guard> Sync for ConcurrentOrderedList<T, G> {}

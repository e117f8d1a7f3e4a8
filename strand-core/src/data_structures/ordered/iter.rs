use std::iter::FusedIterator;
use std::marker::PhantomData;

use super::concurrent_ordered_list::ConcurrentOrderedList;
use super::node::NodePtr;
use crate::guard::Guard;

/// Iterator over the `Valid` elements of a [`ConcurrentOrderedList`].
///
/// Holds a read guard for the duration of iteration, so nodes purged while
/// it is running stay allocated until it is dropped. Concurrent changes may
/// or may not be observed.
///
pub struct Iter<'a, T, G: Guard> {
    _guard: G::ReadGuard,
    current: NodePtr<T>,
    _list: PhantomData<&'a ConcurrentOrderedList<T, G>>,
}

impl<'a, T, G: Guard> Iter<'a, T, G> {
    pub(crate) fn new(list: &'a ConcurrentOrderedList<T, G>) -> Self {
        // Pin before loading head.
        let guard = G::pin();
        let first = list.first_node();
        Iter {
            _guard: guard,
            current: first,
            _list: PhantomData,
        }
    }
}

impl<T, G> Iterator for Iter<'_, T, G>
where
    T: Clone,
    G: Guard,
{
    // Clones rather than references: a reference would have to borrow the
    // guard owned by the iterator itself.
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.current.is_null() {
            let node = unsafe { &*self.current };
            self.current = node.get_next();

            if node.is_valid() {
                return Some(node.value().clone());
            }
        }
        None
    }
}

impl<T: Clone, G: Guard> FusedIterator for Iter<'_, T, G> {}

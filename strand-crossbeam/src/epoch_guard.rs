//! [`Guard`] backed by crossbeam-epoch.
//!
//! ```text
//! purge ──► unlink ──► defer_unchecked(dealloc) ──► freed after every
//!                                                   pinned reader moves on
//! ```

use std::fmt;
use std::ops::Deref;

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use strand_core::guard::Guard;

/// Epoch-based reclamation for list nodes.
///
/// Zero-sized: retired nodes go to the global collector, so a list holding
/// an `EpochGuard` stays `Send + Sync` and frees memory while it is in use.
/// Readers pin through [`Guard::pin`], which is a thread-local counter bump.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct EpochGuard;

/// Element reference returned by `find`, pinned for as long as it lives.
pub struct EpochRef<'a, T> {
    _pin: CrossbeamGuard,
    value: &'a T,
}

impl<'a, T> EpochRef<'a, T> {
    /// # Safety
    /// `value` must stay allocated while `pin` is held.
    unsafe fn new(pin: CrossbeamGuard, value: &'a T) -> Self {
        EpochRef { _pin: pin, value }
    }

    pub fn get(&self) -> &T {
        self.value
    }
}

impl<T> Deref for EpochRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: fmt::Display> fmt::Display for EpochRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.value, f)
    }
}

impl<T: fmt::Debug> fmt::Debug for EpochRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EpochRef({:?})", self.value)
    }
}

impl Guard for EpochGuard {
    type GuardedRef<'a, T: 'a> = EpochRef<'a, T>;

    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N: Send + 'static>(
        &self,
        node: *mut N,
        dealloc: unsafe fn(*mut N),
    ) {
        // The closure may run on whichever thread next collects garbage.
        let pin = epoch::pin();
        unsafe {
            pin.defer_unchecked(move || dealloc(node));
        }
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        let pin = epoch::pin();
        unsafe { EpochRef::new(pin, &*ptr) }
    }
}

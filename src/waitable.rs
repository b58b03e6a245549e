//! `WaitableOwner<T>` — an [`Owner`] that can block until quiescence.
//!
//! The plain owner never blocks. This flavor pairs it with a
//! mutex/condvar channel used exclusively for the blocking waits: the
//! registration/release hot path stays lock-free, except that a release
//! (or registration rollback) which takes a retired owner's count to zero
//! locks the channel briefly to wake waiters. Taking the lock before
//! notifying is what closes the race between the zero crossing and a
//! waiter that has checked its predicate but not yet gone to sleep.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::HandleError;
use crate::handle::Handle;
use crate::owner::Owner;
use crate::reclaim::{DropReclaim, Reclaim};

/// The wait channel: a mutex/condvar pair serving only the blocking-wait
/// handshake. Handles issued by a waitable owner carry a reference to it
/// so the zero-crossing release can wake waiters.
pub(crate) struct WaitSet {
    gate: Mutex<()>,
    quiescent: Condvar,
}

impl WaitSet {
    const fn new() -> Self {
        Self {
            gate: Mutex::new(()),
            quiescent: Condvar::new(),
        }
    }

    /// Wakes all waiters. Locks the gate first so a waiter between its
    /// predicate check and its sleep cannot miss the notification.
    pub(crate) fn notify(&self) {
        let _held = self.gate.lock();
        self.quiescent.notify_all();
    }
}

/// An [`Owner`] extended with blocking wait-for-quiescence.
///
/// Everything the plain owner does, plus
/// [`retire_and_wait`](WaitableOwner::retire_and_wait) and its bounded
/// variants for deterministic shutdown: retire, sleep until the last
/// handle is released, reclaim.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use quiesce::WaitableOwner;
///
/// let owner = WaitableOwner::new(String::from("draining"));
/// let handle = owner.try_handle().unwrap();
///
/// // Bounded wait fails while the handle lives...
/// assert!(!owner.retire_and_wait_for(Duration::from_millis(10)));
///
/// // ...and completes once it is gone.
/// drop(handle);
/// assert!(owner.retire_and_wait_for(Duration::from_millis(10)));
/// assert!(owner.is_reclaimed());
/// ```
pub struct WaitableOwner<T, R: Reclaim<T> = DropReclaim> {
    owner: Owner<T, R>,
    wait: WaitSet,
}

impl<T> WaitableOwner<T> {
    /// Creates a waitable owner managing `value` with the default
    /// strategy.
    #[inline]
    pub fn new(value: T) -> Self {
        Self::from(Owner::new(value))
    }

    /// Creates a waitable owner managing nothing.
    #[inline]
    pub fn vacant() -> Self {
        Self::from(Owner::vacant())
    }
}

impl<T, R: Reclaim<T>> WaitableOwner<T, R> {
    /// Creates a waitable owner managing `value`, disposing of it through
    /// `reclaim`.
    #[inline]
    pub fn with_reclaim(value: T, reclaim: R) -> Self {
        Self::from(Owner::with_reclaim(value, reclaim))
    }

    // ---- Borrowing (see `Owner`) ----

    /// Requests a handle; `None` once retired (or vacant). See
    /// [`Owner::try_handle`].
    #[inline]
    pub fn try_handle(&self) -> Option<Handle<'_, T>> {
        self.owner.issue(Some(&self.wait)).ok()
    }

    /// Requests a handle, with a distinguishable error on refusal. See
    /// [`Owner::handle`].
    #[inline]
    pub fn handle(&self) -> Result<Handle<'_, T>, HandleError> {
        self.owner.issue(Some(&self.wait))
    }

    // ---- Teardown ----

    /// Closes the door to new handles. See [`Owner::retire`].
    #[inline]
    pub fn retire(&self) {
        self.owner.retire();
    }

    /// Destroys the value now if possible. See [`Owner::try_reclaim`].
    #[inline]
    pub fn try_reclaim(&self) -> bool {
        self.owner.try_reclaim()
    }

    /// Retires, then destroys the value if already quiescent. See
    /// [`Owner::retire_and_reclaim`].
    #[inline]
    pub fn retire_and_reclaim(&self) -> bool {
        self.owner.retire_and_reclaim()
    }

    /// Retires, then blocks until reclamation has completed. For
    /// deterministic shutdown; no timeout.
    ///
    /// Returns once the value has been destroyed — by this thread or, if
    /// a concurrent caller won the reclamation race, by that one.
    ///
    /// The calling thread must not itself hold a handle to this owner:
    /// the wait can then never finish.
    pub fn retire_and_wait(&self) {
        self.owner.retire();
        loop {
            // Claim outside the gate: the disposal strategy is user code
            // and must not run under the wait lock.
            if self.owner.try_reclaim() || self.owner.is_reclaimed() {
                return;
            }
            let mut held = self.wait.gate.lock();
            // Re-check under the gate before sleeping; the zero-crossing
            // release takes the same gate to notify, so it either finds
            // us asleep or we see the drained count here. A claim lost to
            // a transient registration is re-signalled by that
            // registration's rollback.
            if self.owner.borrow_count() != 0 && !self.owner.is_reclaimed() {
                self.wait.quiescent.wait(&mut held);
            }
        }
    }

    /// Bounded [`retire_and_wait`](WaitableOwner::retire_and_wait):
    /// returns whether reclamation completed before `timeout` elapsed.
    ///
    /// On `false` the owner stays retired-but-unreclaimed; a later call
    /// (or a plain [`try_reclaim`](WaitableOwner::try_reclaim)) may
    /// complete it.
    #[inline]
    pub fn retire_and_wait_for(&self, timeout: Duration) -> bool {
        self.retire_and_wait_until(Instant::now() + timeout)
    }

    /// Deadline flavor of
    /// [`retire_and_wait_for`](WaitableOwner::retire_and_wait_for).
    pub fn retire_and_wait_until(&self, deadline: Instant) -> bool {
        self.owner.retire();
        loop {
            if self.owner.try_reclaim() || self.owner.is_reclaimed() {
                return true;
            }
            let mut held = self.wait.gate.lock();
            if self.owner.borrow_count() != 0 && !self.owner.is_reclaimed() {
                if self.wait.quiescent.wait_until(&mut held, deadline).timed_out() {
                    drop(held);
                    // One last attempt: the zero crossing may have landed
                    // between the final predicate check and the timeout.
                    return self.owner.try_reclaim() || self.owner.is_reclaimed();
                }
            }
        }
    }

    // ---- Snapshots ----

    /// Number of live handles. See [`Owner::borrow_count`].
    #[inline]
    pub fn borrow_count(&self) -> usize {
        self.owner.borrow_count()
    }

    /// Whether any handle is outstanding.
    #[inline]
    pub fn has_borrows(&self) -> bool {
        self.owner.has_borrows()
    }

    /// Whether the owner has been retired.
    #[inline]
    pub fn is_retired(&self) -> bool {
        self.owner.is_retired()
    }

    /// Whether the value has been destroyed.
    #[inline]
    pub fn is_reclaimed(&self) -> bool {
        self.owner.is_reclaimed()
    }

    // ---- Exclusive access ----

    /// Mutable access to the value, if any. See [`Owner::get_mut`].
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.owner.get_mut()
    }

    /// Consumes the owner and returns the value without running the
    /// disposal strategy. See [`Owner::into_inner`].
    #[inline]
    pub fn into_inner(self) -> Option<T> {
        self.owner.into_inner()
    }
}

impl<T, R: Reclaim<T>> From<Owner<T, R>> for WaitableOwner<T, R> {
    /// Upgrades a plain owner. By-value, so no handle can be outstanding.
    #[inline]
    fn from(owner: Owner<T, R>) -> Self {
        Self {
            owner,
            wait: WaitSet::new(),
        }
    }
}

impl<T, R: Reclaim<T>> core::fmt::Debug for WaitableOwner<T, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WaitableOwner")
            .field("borrows", &self.borrow_count())
            .field("retired", &self.is_retired())
            .field("reclaimed", &self.is_reclaimed())
            .finish_non_exhaustive()
    }
}

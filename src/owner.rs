//! `Owner<T>` — exclusive authority over a value's destruction.
//!
//! The owner holds the value, counts borrows, and performs reclamation.
//! Registration and release are lock-free; reclamation is a single
//! compare-and-set with exactly one winner over the owner's lifetime.
//!
//! Handles borrow the owner, so the compiler enforces the one protocol
//! rule the atomics cannot: an owner never dies while a handle is alive.

use core::cell::UnsafeCell;
use core::fmt;

use crate::error::HandleError;
use crate::handle::{self, Handle};
use crate::lifecycle::Lifecycle;
use crate::reclaim::{DropReclaim, Reclaim};
use crate::waitable::WaitSet;

/// Exclusive owner of a value, with counted borrows and explicit,
/// vetoable reclamation.
///
/// Unlike `Arc`, releasing the last [`Handle`] destroys nothing: the owner
/// alone decides when teardown starts ([`retire`](Owner::retire)) and the
/// value is destroyed only once no handle exists
/// ([`try_reclaim`](Owner::try_reclaim)). Retiring closes the door to new
/// handles, so the borrow count can only drain.
///
/// `R` is the disposal strategy, [`DropReclaim`] by default.
///
/// # Examples
///
/// ```rust
/// use quiesce::Owner;
///
/// let owner = Owner::new(42u32);
///
/// let handle = owner.try_handle().unwrap();
/// assert_eq!(*handle, 42);
///
/// owner.retire();
/// assert!(owner.try_handle().is_none()); // door is closed
/// assert!(!owner.try_reclaim()); // vetoed: one borrow outstanding
///
/// drop(handle);
/// assert!(owner.try_reclaim()); // quiescent: value destroyed here
/// ```
pub struct Owner<T, R: Reclaim<T> = DropReclaim> {
    /// The managed value. Written at construction and by the single
    /// reclamation winner; handles only ever read through it.
    slot: UnsafeCell<Option<T>>,
    /// Taken mutably by the reclamation winner (or `Drop`), never both.
    reclaimer: UnsafeCell<R>,
    lifecycle: Lifecycle,
}

// SAFETY: sending an Owner moves the value and the strategy with it.
unsafe impl<T: Send, R: Reclaim<T> + Send> Send for Owner<T, R> {}

// SAFETY: a shared Owner hands out `&T` through handles (T: Sync), and any
// thread holding `&Owner` may win reclamation, which drops `T` and runs
// `R` on that thread (T: Send, R: Send).
unsafe impl<T: Send + Sync, R: Reclaim<T> + Send> Sync for Owner<T, R> {}

impl<T> Owner<T> {
    /// Creates an owner managing `value` with the default strategy
    /// (drop in place).
    #[inline]
    pub fn new(value: T) -> Self {
        Self::with_reclaim(value, DropReclaim)
    }

    /// Creates an owner managing nothing.
    ///
    /// A vacant owner refuses handles with [`HandleError::Vacant`] and
    /// reclaims trivially — useful as a placeholder in teardown paths
    /// that treat "already gone" and "draining" uniformly.
    #[inline]
    pub fn vacant() -> Self {
        Self {
            slot: UnsafeCell::new(None),
            reclaimer: UnsafeCell::new(DropReclaim),
            lifecycle: Lifecycle::new(),
        }
    }
}

impl<T, R: Reclaim<T>> Owner<T, R> {
    /// Creates an owner managing `value`, disposing of it through
    /// `reclaim` (see [`Reclaim`], [`ReclaimFn`](crate::ReclaimFn)).
    #[inline]
    pub fn with_reclaim(value: T, reclaim: R) -> Self {
        Self {
            slot: UnsafeCell::new(Some(value)),
            reclaimer: UnsafeCell::new(reclaim),
            lifecycle: Lifecycle::new(),
        }
    }

    // ---- Borrowing ----

    /// Requests a handle; `None` once the owner is retired (or vacant).
    ///
    /// Lock-free: an optimistic count increment, one flag read, and on
    /// the losing path a rollback decrement. Safe to call from any number
    /// of threads concurrently with each other and with
    /// [`retire`](Owner::retire) / [`try_reclaim`](Owner::try_reclaim).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quiesce::Owner;
    ///
    /// let owner = Owner::new(String::from("shared"));
    /// let a = owner.try_handle().unwrap();
    /// let b = owner.try_handle().unwrap();
    /// assert_eq!(owner.borrow_count(), 2);
    /// drop((a, b));
    /// ```
    #[inline]
    pub fn try_handle(&self) -> Option<Handle<'_, T>> {
        self.issue(None).ok()
    }

    /// Requests a handle, with a distinguishable error on refusal.
    ///
    /// Same semantics as [`try_handle`](Owner::try_handle); use this
    /// flavor when the caller propagates the refusal.
    #[inline]
    pub fn handle(&self) -> Result<Handle<'_, T>, HandleError> {
        self.issue(None)
    }

    /// Registration via optimistic increment-then-validate, on behalf of
    /// this owner or a waitable wrapper around it.
    ///
    /// The increment commits before the retired flag is read. Either the
    /// flag is clear and the borrow stands — in which case any later
    /// reclamation sees a nonzero count and is vetoed — or the flag is
    /// set and the increment rolls back through the same waking release
    /// path a handle drop uses. Reclamation can therefore never observe
    /// `borrows == 0` while this call holds an uncommitted increment.
    pub(crate) fn issue<'a>(
        &'a self,
        waiter: Option<&'a WaitSet>,
    ) -> Result<Handle<'a, T>, HandleError> {
        self.lifecycle.register();
        if self.lifecycle.retired_gate() {
            handle::release(&self.lifecycle, waiter);
            return Err(HandleError::Retired);
        }
        // SAFETY: the committed registration pins the slot. Reclamation
        // requires `borrows == 0`, and every registration that starts
        // after retire() rolls back, so the winner's take() cannot run
        // while this borrow stands. The slot itself is only written at
        // construction and by that winner.
        let value = unsafe { &*self.slot.get() };
        match value {
            Some(value) => Ok(Handle::new(value, &self.lifecycle, waiter)),
            None => {
                handle::release(&self.lifecycle, waiter);
                Err(HandleError::Vacant)
            }
        }
    }

    // ---- Teardown ----

    /// Closes the door: no registration that starts after this call can
    /// succeed. Idempotent, irreversible, never blocks.
    ///
    /// Existing handles are unaffected; the owner transitions to
    /// *retired* and waits (passively) for them to drain.
    #[inline]
    pub fn retire(&self) {
        self.lifecycle.retire();
    }

    /// Destroys the value now if it is destroyable: retired, not already
    /// reclaimed, and no handle outstanding.
    ///
    /// Safe to call repeatedly and from any number of threads; the
    /// reclaimed transition is a single compare-and-set, so exactly one
    /// call over the owner's lifetime returns `true`, and the strategy
    /// runs exactly once, on the winning thread. Losers return `false`
    /// with no side effect.
    ///
    /// Single-attempt: there is no internal retry. Callers poll from
    /// their own shutdown loop, or use
    /// [`WaitableOwner`](crate::WaitableOwner) to block instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quiesce::Owner;
    ///
    /// let owner = Owner::new(7u8);
    /// assert!(!owner.try_reclaim()); // not retired yet
    /// owner.retire();
    /// assert!(owner.try_reclaim());
    /// assert!(!owner.try_reclaim()); // already reclaimed
    /// ```
    pub fn try_reclaim(&self) -> bool {
        if !self.lifecycle.try_claim() {
            return false;
        }
        // SAFETY: we won the reclaimed CAS — no other thread will ever
        // touch the slot or the reclaimer again, and the Acquire count
        // load inside the claim ordered every released borrow's use of
        // the value before this point. A transient registration may have
        // bumped the count after our zero read, but it is doomed to roll
        // back (the gate was closed before the claim) and never observes
        // the slot.
        let value = unsafe { (*self.slot.get()).take() };
        if let Some(value) = value {
            // SAFETY: exclusive by the same winner-take-all argument.
            let reclaimer = unsafe { &mut *self.reclaimer.get() };
            reclaimer.reclaim(value);
        }
        true
    }

    /// [`retire`](Owner::retire) and [`try_reclaim`](Owner::try_reclaim)
    /// in one call: the impatient shutdown.
    #[inline]
    pub fn retire_and_reclaim(&self) -> bool {
        self.retire();
        self.try_reclaim()
    }

    // ---- Snapshots ----

    /// Number of live handles. A snapshot; may transiently include a
    /// registration that is about to roll back.
    #[inline]
    pub fn borrow_count(&self) -> usize {
        self.lifecycle.borrows()
    }

    /// Whether any handle is outstanding.
    #[inline]
    pub fn has_borrows(&self) -> bool {
        self.lifecycle.borrows() > 0
    }

    /// Whether [`retire`](Owner::retire) has been called.
    #[inline]
    pub fn is_retired(&self) -> bool {
        self.lifecycle.is_retired()
    }

    /// Whether the value has been destroyed.
    #[inline]
    pub fn is_reclaimed(&self) -> bool {
        self.lifecycle.is_reclaimed()
    }

    // ---- Exclusive access ----

    /// Mutable access to the value, if any.
    ///
    /// `&mut self` proves no handle exists (handles borrow the owner),
    /// so this cannot race a reader.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.slot.get_mut().as_mut()
    }

    /// Consumes the owner and returns the value without running the
    /// disposal strategy. `None` if the owner was vacant or already
    /// reclaimed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quiesce::Owner;
    ///
    /// let owner = Owner::new(String::from("kept"));
    /// assert_eq!(owner.into_inner().as_deref(), Some("kept"));
    /// ```
    #[inline]
    pub fn into_inner(mut self) -> Option<T> {
        // Drop then sees an empty slot and reclaims nothing.
        self.slot.get_mut().take()
    }
}

impl<T, R: Reclaim<T>> Drop for Owner<T, R> {
    fn drop(&mut self) {
        // Unreachable from safe code: handles borrow the owner, so the
        // compiler rejects dropping it while one lives. Backstop only.
        debug_assert_eq!(
            self.lifecycle.borrows(),
            0,
            "owner dropped with outstanding handles"
        );
        if !self.lifecycle.is_reclaimed() {
            if let Some(value) = self.slot.get_mut().take() {
                self.reclaimer.get_mut().reclaim(value);
            }
        }
    }
}

impl<T, R: Reclaim<T>> fmt::Debug for Owner<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("borrows", &self.borrow_count())
            .field("retired", &self.is_retired())
            .field("reclaimed", &self.is_reclaimed())
            .finish_non_exhaustive()
    }
}

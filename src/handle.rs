//! `Handle<'a, T>` — the move-only borrow token issued by an owner.
//!
//! A handle is proof of one live borrow: while it exists, the owner's
//! count is elevated and reclamation is vetoed. Dropping the handle
//! releases exactly one unit; moving it transfers the unit without
//! touching the count. There is no way to duplicate a handle and no
//! dissociated zombie state — a moved-from handle simply no longer
//! exists.
//!
//! Projection follows the `cell::Ref` model: [`Handle::map`] and
//! [`Handle::filter_map`] are associated functions (so they never shadow
//! methods of the target type) that consume the handle and re-point it,
//! carrying the single borrow unit along. [`Handle::downcast`] builds the
//! runtime-checked variant on top for `dyn Any` targets.

use core::any::Any;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::Deref;

use crate::lifecycle::Lifecycle;
use crate::waitable::WaitSet;

/// A counted borrow of an [`Owner`](crate::Owner)'s value.
///
/// Handles are issued by [`Owner::try_handle`](crate::Owner::try_handle) /
/// [`Owner::handle`](crate::Owner::handle) (and the
/// [`WaitableOwner`](crate::WaitableOwner) equivalents) and release their
/// borrow when dropped. Access goes through [`Deref`] or
/// [`get`](Handle::get); the projected reference is bounded by the handle
/// borrow, so it cannot outlive the handle.
///
/// `Handle` is `Send` and `Sync` exactly when `T: Sync` — it only ever
/// hands out `&T`.
///
/// # Examples
///
/// ```rust
/// use quiesce::Owner;
///
/// let owner = Owner::new(vec![1, 2, 3]);
/// let handle = owner.try_handle().unwrap();
/// assert_eq!(handle.len(), 3);
/// assert_eq!(owner.borrow_count(), 1);
/// drop(handle);
/// assert_eq!(owner.borrow_count(), 0);
/// ```
#[must_use = "dropping a handle immediately releases its borrow"]
pub struct Handle<'a, T: ?Sized> {
    target: &'a T,
    lifecycle: &'a Lifecycle,
    waiter: Option<&'a WaitSet>,
}

/// Releases one borrow unit, waking waiters on the zero crossing.
///
/// Shared by `Handle::drop` and the registration rollback: a rollback that
/// takes a transient count from 1 to 0 on a retired owner must wake a
/// blocked waiter just like a real release would, otherwise the waiter
/// whose claim lost to the transient increment would sleep forever.
#[inline]
pub(crate) fn release(lifecycle: &Lifecycle, waiter: Option<&WaitSet>) {
    let prev = lifecycle.unregister();
    if prev == 1 && lifecycle.is_retired() {
        if let Some(waiter) = waiter {
            waiter.notify();
        }
    }
}

impl<'a, T: ?Sized> Handle<'a, T> {
    /// The borrow is already registered; this just binds the token.
    #[inline]
    pub(crate) fn new(
        target: &'a T,
        lifecycle: &'a Lifecycle,
        waiter: Option<&'a WaitSet>,
    ) -> Self {
        Self {
            target,
            lifecycle,
            waiter,
        }
    }

    /// Returns a reference to the target, bounded by the handle borrow.
    ///
    /// Equivalent to `&*handle`; provided for call sites where the
    /// explicit form reads better.
    #[inline]
    pub fn get(&self) -> &T {
        self.target
    }

    /// Consumes the handle, re-pointing it through `f` while keeping the
    /// same borrow registration.
    ///
    /// This is the static cast: unsize to a trait object, narrow to a
    /// field, or both. The owner's count is untouched — exactly one
    /// borrow unit moves from `this` into the result.
    ///
    /// An associated function, called as `Handle::map(h, f)`, so it never
    /// shadows a `map` method on the target.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quiesce::{Handle, Owner};
    ///
    /// let owner = Owner::new((1u8, "two"));
    /// let tuple = owner.try_handle().unwrap();
    /// let second: Handle<'_, str> = Handle::map(tuple, |t| t.1);
    /// assert_eq!(&*second, "two");
    /// assert_eq!(owner.borrow_count(), 1);
    /// ```
    #[inline]
    pub fn map<U: ?Sized, F>(this: Self, f: F) -> Handle<'a, U>
    where
        F: FnOnce(&T) -> &U,
    {
        // Skip Drop: the borrow unit transfers instead of releasing.
        let this = ManuallyDrop::new(this);
        Handle {
            target: f(this.target),
            lifecycle: this.lifecycle,
            waiter: this.waiter,
        }
    }

    /// Fallible [`map`](Handle::map): all-or-nothing.
    ///
    /// On `Some`, the borrow transfers into the returned handle. On
    /// `None`, the untouched source comes back in `Err` — still
    /// registered, still dereferenceable — so callers can retry or fall
    /// back without leaking or double-releasing a borrow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quiesce::{Handle, Owner};
    ///
    /// let owner = Owner::new(vec![10, 20]);
    /// let h = owner.try_handle().unwrap();
    /// let h = Handle::filter_map(h, |v| v.get(5)).expect_err("index 5 is out of bounds");
    /// let first = Handle::filter_map(h, |v| v.first()).expect("index 0 exists");
    /// assert_eq!(*first, 10);
    /// ```
    #[inline]
    pub fn filter_map<U: ?Sized, F>(this: Self, f: F) -> Result<Handle<'a, U>, Self>
    where
        F: FnOnce(&T) -> Option<&U>,
    {
        match f(this.target) {
            Some(target) => {
                let this = ManuallyDrop::new(this);
                Ok(Handle {
                    target,
                    lifecycle: this.lifecycle,
                    waiter: this.waiter,
                })
            }
            None => Err(this),
        }
    }
}

impl<'a> Handle<'a, dyn Any> {
    /// Runtime-checked downcast to a concrete type.
    ///
    /// On success the borrow transfers to the returned handle; on failure
    /// the intact source comes back in `Err`, same contract as
    /// [`filter_map`](Handle::filter_map).
    #[inline]
    pub fn downcast<U: Any>(self) -> Result<Handle<'a, U>, Self> {
        Handle::filter_map(self, |any| any.downcast_ref::<U>())
    }
}

impl<'a> Handle<'a, dyn Any + Send + Sync> {
    /// Runtime-checked downcast to a concrete type.
    ///
    /// On success the borrow transfers to the returned handle; on failure
    /// the intact source comes back in `Err`, same contract as
    /// [`filter_map`](Handle::filter_map).
    #[inline]
    pub fn downcast<U: Any>(self) -> Result<Handle<'a, U>, Self> {
        Handle::filter_map(self, |any| any.downcast_ref::<U>())
    }
}

impl<T: ?Sized> Deref for Handle<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: ?Sized> Drop for Handle<'_, T> {
    #[inline]
    fn drop(&mut self) {
        release(self.lifecycle, self.waiter);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

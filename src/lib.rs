//! Quiesce: owner-arbitrated object lifetime with lock-free borrow
//! tracking and explicit, vetoable reclamation.
//!
//! An [`Owner<T>`] is the sole authority over a value's destruction. Any
//! number of threads may take short-lived [`Handle`]s to the value; while
//! one exists, destruction is vetoed. Unlike reference counting, nothing
//! is destroyed when the last handle goes away — the owner must *retire*
//! (closing the door to new handles) and then *reclaim*, which succeeds
//! exactly once, and only at quiescence.
//!
//! # Key Features
//!
//! - **Lock-Free Borrowing**: handle creation and release are an atomic
//!   increment/decrement plus one flag read — no locks on the hot path
//! - **Vetoable Teardown**: reclamation is owner-initiated and denied
//!   while any handle is outstanding, with a winner-take-all transition
//!   under contention
//! - **Blocking Drain**: [`WaitableOwner`] adds wait-for-quiescence with
//!   optional timeout or deadline for deterministic shutdown
//! - **Borrow-Preserving Casts**: [`Handle::map`], [`Handle::filter_map`]
//!   and [`Handle::downcast`] re-point a handle (upcast, field, runtime
//!   downcast) while moving exactly one borrow unit
//!
//! # Example
//!
//! ```rust
//! use quiesce::Owner;
//!
//! let owner = Owner::new(vec![1, 2, 3]);
//!
//! // Borrowers take counted handles.
//! let handle = owner.try_handle().unwrap();
//! assert_eq!(handle.len(), 3);
//!
//! // Shutdown: close the door, then reclaim once drained.
//! owner.retire();
//! assert!(owner.try_handle().is_none());
//! assert!(!owner.try_reclaim()); // vetoed while `handle` lives
//!
//! drop(handle);
//! assert!(owner.try_reclaim()); // destroyed here, exactly once
//! ```
//!
//! The typical home for an `Owner` is inside a long-lived component whose
//! shutdown sequence calls `retire()` and then polls `try_reclaim()` — or
//! blocks on a [`WaitableOwner`] — after telling its workers to finish.

#![warn(missing_docs)]

mod error;
mod handle;
mod lifecycle;
mod owner;
mod reclaim;
mod waitable;

pub use error::HandleError;
pub use handle::Handle;
pub use owner::Owner;
pub use reclaim::{DropReclaim, Reclaim, ReclaimFn};
pub use waitable::WaitableOwner;

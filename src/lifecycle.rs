//! The atomic lifecycle state machine shared by both owner flavors.
//!
//! Three words of state, four transitions:
//!
//! - `register`/`unregister`: optimistic borrow accounting. Registration
//!   increments *first* and validates the retired flag *after*; a
//!   registration that lost the race rolls back with a matching decrement.
//! - `retire`: one-way gate. Once set, every registration that starts
//!   afterward observes it and rolls back.
//! - `try_claim`: the single reclaimed transition, winner-take-all.
//!
//! The increment-before-check order is what makes the count trustworthy:
//! any claim that observes `borrows == 0` is ordered after every
//! registration either fully committed (and is therefore visible in the
//! count) or fully rolled back. There is no window in which a claimed
//! reclamation and an uncommitted borrow coexist.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Borrow count plus the two monotonic flags.
///
/// The count is hammered by every handle creation and drop; the flags flip
/// once per owner lifetime. Padding the count keeps releases from false
/// sharing with flag readers.
pub(crate) struct Lifecycle {
    borrows: CachePadded<AtomicUsize>,
    retired: AtomicBool,
    reclaimed: AtomicBool,
}

impl Lifecycle {
    pub(crate) const fn new() -> Self {
        Self {
            borrows: CachePadded::new(AtomicUsize::new(0)),
            retired: AtomicBool::new(false),
            reclaimed: AtomicBool::new(false),
        }
    }

    /// Optimistically registers a borrow. Always increments; the caller
    /// must consult [`retired_gate`](Self::retired_gate) afterwards and
    /// roll back via [`unregister`](Self::unregister) if the gate closed.
    ///
    /// SeqCst pairs with the SeqCst store in `retire()`: a registration
    /// that starts after `retire()` returns cannot miss the flag.
    #[inline]
    pub(crate) fn register(&self) {
        self.borrows.fetch_add(1, Ordering::SeqCst);
    }

    /// Releases one borrow (or rolls back a failed registration).
    /// Returns the previous count, so callers can detect the zero
    /// crossing (`prev == 1`).
    #[inline]
    pub(crate) fn unregister(&self) -> usize {
        let prev = self.borrows.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "borrow released with count already zero");
        prev
    }

    /// Closes the gate. Idempotent, irreversible.
    #[inline]
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    /// The registration-path read of the retired flag. SeqCst so that the
    /// flag store and this load fall into one total order with the count
    /// updates around them.
    #[inline]
    pub(crate) fn retired_gate(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Snapshot: has the gate been closed?
    #[inline]
    pub(crate) fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Snapshot: has reclamation happened?
    #[inline]
    pub(crate) fn is_reclaimed(&self) -> bool {
        self.reclaimed.load(Ordering::Acquire)
    }

    /// Snapshot of the borrow count. May include registrations that are
    /// about to roll back.
    #[inline]
    pub(crate) fn borrows(&self) -> usize {
        self.borrows.load(Ordering::Acquire)
    }

    /// Attempts the reclaimed transition: retired, not yet reclaimed, no
    /// outstanding borrows, then a compare-and-set so concurrent claimants
    /// have exactly one winner. Losers see `false` and must not touch the
    /// slot.
    ///
    /// The Acquire count load synchronizes with the releasing decrements,
    /// so everything former borrowers did with the value happens-before
    /// the winner destroys it. The AcqRel success ordering publishes the
    /// claim before the winner's slot reset becomes observable.
    pub(crate) fn try_claim(&self) -> bool {
        if !self.retired.load(Ordering::Acquire) {
            return false;
        }
        if self.reclaimed.load(Ordering::Acquire) {
            return false;
        }
        if self.borrows.load(Ordering::Acquire) != 0 {
            return false;
        }
        self.reclaimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state() {
        let lc = Lifecycle::new();
        assert_eq!(lc.borrows(), 0);
        assert!(!lc.is_retired());
        assert!(!lc.is_reclaimed());
    }

    #[test]
    fn register_unregister_roundtrip() {
        let lc = Lifecycle::new();
        lc.register();
        lc.register();
        assert_eq!(lc.borrows(), 2);
        assert_eq!(lc.unregister(), 2);
        assert_eq!(lc.unregister(), 1);
        assert_eq!(lc.borrows(), 0);
    }

    #[test]
    fn retire_is_idempotent() {
        let lc = Lifecycle::new();
        lc.retire();
        lc.retire();
        assert!(lc.is_retired());
        assert!(lc.retired_gate());
    }

    #[test]
    fn claim_requires_retired() {
        let lc = Lifecycle::new();
        assert!(!lc.try_claim());
        lc.retire();
        assert!(lc.try_claim());
    }

    #[test]
    fn claim_vetoed_by_borrows() {
        let lc = Lifecycle::new();
        lc.register();
        lc.retire();
        assert!(!lc.try_claim());
        lc.unregister();
        assert!(lc.try_claim());
    }

    #[test]
    fn claim_has_one_winner() {
        let lc = Lifecycle::new();
        lc.retire();
        assert!(lc.try_claim());
        assert!(!lc.try_claim());
        assert!(lc.is_reclaimed());
    }
}

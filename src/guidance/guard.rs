//! Single-flight latch for step transitions.

use std::sync::atomic::{AtomicBool, Ordering};

/// Latch guaranteeing at most one transition per step.
///
/// The first caller of [`try_advance`](Self::try_advance) wins and holds the
/// latch until [`release`](Self::release) is called once the transition's
/// visual delay has elapsed; every other trigger arriving meanwhile is
/// rejected.
#[derive(Debug, Default)]
pub struct AdvanceGuard {
    advancing: AtomicBool,
}

impl AdvanceGuard {
    /// Creates an open latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            advancing: AtomicBool::new(false),
        }
    }

    /// Runs `transition` if no transition is in flight.
    ///
    /// Returns `false` without running it when the latch is already held.
    pub fn try_advance<F: FnOnce()>(&self, transition: F) -> bool {
        if self
            .advancing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        transition();
        true
    }

    /// Opens the latch.
    pub fn release(&self) {
        self.advancing.store(false, Ordering::SeqCst);
    }

    /// Whether a transition currently holds the latch.
    #[must_use]
    pub fn is_advancing(&self) -> bool {
        self.advancing.load(Ordering::SeqCst)
    }
}

//! Step sequencing with the cycle-back rule.

/// Result of asking the sequencer for the step after the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStep {
    /// Index to enter next
    pub index: usize,
    /// Whether the sequence wrapped back to the cycle anchor
    pub wrapped: bool,
}

/// Pure next-index function over a catalog of `len` steps that repeats from
/// `anchor` once the last step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSequencer {
    len: usize,
    anchor: usize,
}

impl StepSequencer {
    /// Creates a sequencer. The caller guarantees `anchor < len`.
    #[must_use]
    pub const fn new(len: usize, anchor: usize) -> Self {
        Self { len, anchor }
    }

    /// Whether `index` is the final step before the sequence wraps.
    #[must_use]
    pub const fn is_last(&self, index: usize) -> bool {
        index + 1 == self.len
    }

    /// Returns the step after `current`, wrapping to the anchor past the end.
    #[must_use]
    pub const fn next(&self, current: usize) -> NextStep {
        let candidate = current + 1;
        if candidate >= self.len {
            NextStep {
                index: self.anchor,
                wrapped: true,
            }
        } else {
            NextStep {
                index: candidate,
                wrapped: false,
            }
        }
    }
}

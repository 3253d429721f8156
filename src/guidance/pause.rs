//! Freezing and thawing the active step as one unit.

use tokio::time::Instant;

use super::catalog::StepKind;
use super::timers::{StepTimers, TimerPhase};
use crate::ports::NarrationPort;

/// Step state captured at the moment of pausing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrozenStep {
    pub(crate) step_index: usize,
    pub(crate) kind: StepKind,
    pub(crate) time_remaining_seconds: u32,
    pub(crate) compression_count: u32,
}

/// Holds the frozen step between `pause` and `resume`.
///
/// Pausing cancels the countdown and metronome, keeping how far each was
/// from its next tick or beat, and suspends narration. Resuming re-arms the
/// countdown from the frozen remaining seconds and restarts the metronome
/// for a compressions step, each first firing after the time it still owed,
/// then resumes narration. Counting continues from the frozen compression
/// count.
#[derive(Debug, Default)]
pub(crate) struct PauseController {
    frozen: Option<(FrozenStep, TimerPhase)>,
}

impl PauseController {
    /// Freezes `step`. Returns `false` when already paused.
    pub(crate) fn pause(
        &mut self,
        step: FrozenStep,
        timers: &mut StepTimers,
        narration: &dyn NarrationPort,
    ) -> bool {
        if self.frozen.is_some() {
            return false;
        }
        let phase = timers.suspend(Instant::now());
        narration.pause();
        self.frozen = Some((step, phase));
        true
    }

    /// Thaws the frozen step under a fresh timer `epoch`. Returns `None`
    /// when not paused.
    pub(crate) fn resume(
        &mut self,
        epoch: u64,
        timers: &mut StepTimers,
        narration: &dyn NarrationPort,
    ) -> Option<FrozenStep> {
        let (frozen, phase) = self.frozen.take()?;
        timers.arm_at(epoch, frozen.kind, frozen.time_remaining_seconds, phase);
        narration.resume();
        Some(frozen)
    }

    /// Discards any frozen step without re-arming.
    pub(crate) fn clear(&mut self) {
        self.frozen = None;
    }

    pub(crate) const fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }
}

//! Session state and the read-only snapshot published to renderers.

use serde::Serialize;

use super::catalog::{StepCatalog, StepKind};
use super::rhythm::RhythmReading;
use super::sequencer::StepSequencer;

/// Coarse engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    /// Not started, or stopped.
    Idle,
    /// A step is running its timers.
    StepActive,
    /// A step is frozen by the pause controller.
    Paused,
    /// Between steps; not interruptible except by stop.
    Transitioning,
}

/// Mutable session owned by the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) step_index: Option<usize>,
    pub(crate) is_running: bool,
    pub(crate) is_paused: bool,
    pub(crate) transitioning: bool,
    pub(crate) time_remaining_seconds: u32,
    pub(crate) compression_count: u32,
    pub(crate) cycle_count: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            step_index: None,
            is_running: false,
            is_paused: false,
            transitioning: false,
            time_remaining_seconds: 0,
            compression_count: 0,
            cycle_count: 1,
        }
    }
}

impl Session {
    pub(crate) const fn phase(&self) -> EnginePhase {
        if !self.is_running {
            EnginePhase::Idle
        } else if self.transitioning {
            EnginePhase::Transitioning
        } else if self.is_paused {
            EnginePhase::Paused
        } else {
            EnginePhase::StepActive
        }
    }

    /// Running, not paused and not between steps.
    pub(crate) const fn is_step_active(&self) -> bool {
        matches!(self.phase(), EnginePhase::StepActive)
    }
}

/// Observable engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuidanceSnapshot {
    /// Coarse engine state
    pub phase: EnginePhase,
    /// Index of the active step; `None` when idle
    pub step_index: Option<usize>,
    /// Declared id of the active step
    pub step_id: Option<u32>,
    /// Kind of the active step
    pub step_type: Option<StepKind>,
    /// Whole seconds left on the active step's countdown
    pub time_remaining_seconds: u32,
    /// Compressions counted in the current compressions step
    pub compression_count: u32,
    /// Compressions needed to finish a compressions step
    pub target_compressions: u32,
    /// Whether the session is paused
    pub is_paused: bool,
    /// Current cycle, starting at 1
    pub cycle_count: u32,
    /// Whether the active step is the last before the sequence wraps
    pub is_last_step_of_cycle: bool,
    /// Latest tap rhythm reading in the current compressions step
    pub rhythm: Option<RhythmReading>,
}

impl GuidanceSnapshot {
    /// Snapshot of an engine that has not started.
    #[must_use]
    pub const fn idle(target_compressions: u32) -> Self {
        Self {
            phase: EnginePhase::Idle,
            step_index: None,
            step_id: None,
            step_type: None,
            time_remaining_seconds: 0,
            compression_count: 0,
            target_compressions,
            is_paused: false,
            cycle_count: 1,
            is_last_step_of_cycle: false,
            rhythm: None,
        }
    }

    pub(crate) fn capture(
        session: &Session,
        catalog: &StepCatalog,
        sequencer: &StepSequencer,
        target_compressions: u32,
        rhythm: Option<RhythmReading>,
    ) -> Self {
        let step = session.step_index.and_then(|i| catalog.get(i));
        Self {
            phase: session.phase(),
            step_index: session.step_index,
            step_id: step.map(|s| s.id),
            step_type: step.map(|s| s.kind),
            time_remaining_seconds: session.time_remaining_seconds,
            compression_count: session.compression_count,
            target_compressions,
            is_paused: session.is_paused,
            cycle_count: session.cycle_count,
            is_last_step_of_cycle: session.step_index.is_some_and(|i| sequencer.is_last(i)),
            rhythm,
        }
    }
}

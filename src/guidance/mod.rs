//! Guidance engine
//!
//! Sequences CPR steps, owns the countdown and metronome timers, and
//! coordinates narration with step progression. Advancement between steps
//! happens exactly once per step, including across pause/resume and the
//! wrap back to the compressions step at the end of each cycle.
//!
//! # Architecture
//!
//! - [`StepCatalog`]: Validated, immutable step list
//! - [`StepSequencer`]: Next-index rule with the cycle-back anchor
//! - [`CountdownTimer`] / [`Metronome`]: Background timer tasks
//! - [`AdvanceGuard`]: Single-flight transition latch
//! - [`GuidanceSnapshot`]: Read-only state published to renderers
//! - [`spawn`] / [`EngineHandle`]: The engine loop and its front-end

pub mod catalog;
pub mod countdown;
pub mod engine;
pub mod guard;
pub mod metronome;
pub(crate) mod pause;
pub mod rhythm;
pub mod sequencer;
pub mod session;
pub mod settings;
pub(crate) mod timers;

pub use catalog::{StepCatalog, StepDescriptor, StepKind};
pub use countdown::CountdownTimer;
pub use engine::{AdvanceReason, Command, EngineHandle, EnginePorts, spawn};
pub use guard::AdvanceGuard;
pub use metronome::{Metronome, beat_interval};
pub use rhythm::{RhythmReading, RhythmTracker, RhythmVerdict};
pub use sequencer::{NextStep, StepSequencer};
pub use session::{EnginePhase, GuidanceSnapshot};
pub use settings::{CompressionSource, GuidanceSettings};

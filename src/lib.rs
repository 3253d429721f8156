//! `cpr-guide` - Step-by-step CPR guidance
//!
//! This library provides the guidance state machine that walks a rescuer
//! through a CPR sequence: countdown-bound steps, a compression metronome
//! with a target count, synchronized narration, pause/resume, and automatic
//! repetition of the compression and breathing cycle.

pub mod cli;
pub mod config;
pub mod error;
pub mod guidance;
pub mod observability;
pub mod ports;

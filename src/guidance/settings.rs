//! Engine parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::metronome::beat_interval;

/// What increments the compression counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionSource {
    /// Every metronome beat counts as one compression.
    #[default]
    Metronome,
    /// Only user taps count; the metronome beeps for pacing.
    Manual,
}

/// Resolved engine parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidanceSettings {
    /// Compression tempo in beats per minute
    pub tempo_bpm: u32,
    /// Compressions needed to finish a compressions step
    pub target_compressions: u32,
    /// Step the sequence returns to after the last step
    pub compressions_step_index: usize,
    /// Pause between leaving one step and entering the next
    pub transition_delay: Duration,
    /// What increments the compression counter
    pub compression_source: CompressionSource,
    /// Whether narration completion may end a timed step
    pub advance_on_narration: bool,
}

impl GuidanceSettings {
    /// Default compression tempo.
    pub const DEFAULT_TEMPO_BPM: u32 = 120;
    /// Default compressions per cycle.
    pub const DEFAULT_TARGET_COMPRESSIONS: u32 = 30;
    /// Default delay between steps.
    pub const DEFAULT_TRANSITION_DELAY: Duration = Duration::from_millis(400);

    /// Beat interval derived from the tempo.
    #[must_use]
    pub fn beat_interval(&self) -> Duration {
        beat_interval(self.tempo_bpm)
    }
}

impl Default for GuidanceSettings {
    fn default() -> Self {
        Self {
            tempo_bpm: Self::DEFAULT_TEMPO_BPM,
            target_compressions: Self::DEFAULT_TARGET_COMPRESSIONS,
            compressions_step_index: 4,
            transition_delay: Self::DEFAULT_TRANSITION_DELAY,
            compression_source: CompressionSource::default(),
            advance_on_narration: false,
        }
    }
}

//! Configuration schema types
//!
//! These types are deserialized from YAML configuration files. Every field
//! is optional; anything left out falls back to the built-in CPR catalog
//! and the default guidance settings.

use serde::{Deserialize, Serialize};

use crate::guidance::{CompressionSource, StepDescriptor};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root of a guidance configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuideConfig {
    /// Engine parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<GuidanceSection>,

    /// Step list; the built-in catalog is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepDescriptor>>,
}

impl GuideConfig {
    /// Mutable access to the `guidance` section, creating it if absent.
    pub fn guidance_mut(&mut self) -> &mut GuidanceSection {
        self.guidance.get_or_insert_with(GuidanceSection::default)
    }
}

// ============================================================================
// Guidance Section
// ============================================================================

/// The `guidance:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuidanceSection {
    /// Compression tempo in beats per minute (1..=240)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<u32>,

    /// Compressions needed to finish a compressions step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_compressions: Option<u32>,

    /// Step the sequence returns to after the last step; defaults to the
    /// first compressions step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressions_step_index: Option<usize>,

    /// Delay between steps, e.g. `400ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_delay: Option<String>,

    /// What increments the compression counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_source: Option<CompressionSource>,

    /// Whether narration completion may end a timed step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_on_narration: Option<bool>,
}

// ============================================================================
// Overrides
// ============================================================================

/// Values supplied on the command line or through the environment.
///
/// Applied on top of the file before validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuidanceOverrides {
    /// Replaces `guidance.tempo_bpm`
    pub tempo_bpm: Option<u32>,
    /// Replaces `guidance.target_compressions`
    pub target_compressions: Option<u32>,
    /// Forces `compression_source: manual`
    pub manual: bool,
    /// Forces `advance_on_narration: true`
    pub advance_on_narration: bool,
}

impl GuidanceOverrides {
    /// Writes the overrides into `config`.
    pub fn apply(&self, config: &mut GuideConfig) {
        if self.tempo_bpm.is_none()
            && self.target_compressions.is_none()
            && !self.manual
            && !self.advance_on_narration
        {
            return;
        }
        let section = config.guidance_mut();
        if let Some(tempo) = self.tempo_bpm {
            section.tempo_bpm = Some(tempo);
        }
        if let Some(target) = self.target_compressions {
            section.target_compressions = Some(target);
        }
        if self.manual {
            section.compression_source = Some(CompressionSource::Manual);
        }
        if self.advance_on_narration {
            section.advance_on_narration = Some(true);
        }
    }
}

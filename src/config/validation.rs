//! Configuration validation
//!
//! Runs on the deserialized `GuideConfig` after overrides are applied.
//! Validation collects ALL errors (doesn't stop at first) to provide
//! comprehensive feedback to users.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::loader::ConfigLimits;
use crate::config::schema::{GuideConfig, GuidanceSection};
use crate::error::{Severity, ValidationIssue};
use crate::guidance::rhythm::{MAX_ON_PACE_BPM, MIN_ON_PACE_BPM};
use crate::guidance::{GuidanceSettings, StepCatalog, StepDescriptor, StepKind, beat_interval};

/// Highest accepted tempo.
pub const MAX_TEMPO_BPM: u32 = 240;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &GuideConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        let builtin;
        let steps: &[StepDescriptor] = if let Some(steps) = &config.steps {
            self.validate_steps(steps, limits);
            steps
        } else {
            builtin = StepCatalog::builtin();
            builtin.steps()
        };

        let defaults = GuidanceSection::default();
        let guidance = config.guidance.as_ref().unwrap_or(&defaults);
        self.validate_guidance(guidance, steps);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Steps
    // ========================================================================

    fn validate_steps(&mut self, steps: &[StepDescriptor], limits: &ConfigLimits) {
        if steps.is_empty() {
            self.add_error("steps", "At least one step is required");
            return;
        }

        if steps.len() > limits.max_steps {
            self.add_error(
                "steps",
                &format!(
                    "Too many steps: {} (maximum: {}). \
                     Set CPR_GUIDE_MAX_STEPS to increase the limit.",
                    steps.len(),
                    limits.max_steps
                ),
            );
        }

        let mut seen_ids = HashSet::new();
        for (i, step) in steps.iter().enumerate() {
            if step.duration_seconds == 0 {
                self.add_error(
                    &format!("steps[{i}].duration_seconds"),
                    "Step duration must be greater than zero",
                );
            }
            if step.narration_text.trim().is_empty() {
                self.add_warning(
                    &format!("steps[{i}].narration_text"),
                    "Step has no narration text",
                );
            }
            if !seen_ids.insert(step.id) {
                self.add_warning(
                    &format!("steps[{i}].id"),
                    &format!("Duplicate step id {}", step.id),
                );
            }
        }

        if !steps.iter().any(|s| s.kind == StepKind::Compressions) {
            self.add_error("steps", "At least one step must have type 'compressions'");
        }
    }

    // ========================================================================
    // Guidance
    // ========================================================================

    fn validate_guidance(&mut self, guidance: &GuidanceSection, steps: &[StepDescriptor]) {
        let tempo = guidance
            .tempo_bpm
            .unwrap_or(GuidanceSettings::DEFAULT_TEMPO_BPM);
        if tempo == 0 {
            self.add_error("guidance.tempo_bpm", "Tempo must be greater than zero");
        } else if tempo > MAX_TEMPO_BPM {
            self.add_error(
                "guidance.tempo_bpm",
                &format!("Tempo {tempo} exceeds the maximum of {MAX_TEMPO_BPM} BPM"),
            );
        } else if !(MIN_ON_PACE_BPM..=MAX_ON_PACE_BPM).contains(&tempo) {
            self.add_warning(
                "guidance.tempo_bpm",
                &format!(
                    "Tempo {tempo} is outside the {MIN_ON_PACE_BPM}-{MAX_ON_PACE_BPM} BPM guideline"
                ),
            );
        }

        let target = guidance
            .target_compressions
            .unwrap_or(GuidanceSettings::DEFAULT_TARGET_COMPRESSIONS);
        if target == 0 {
            self.add_error(
                "guidance.target_compressions",
                "Target compressions must be greater than zero",
            );
        }

        if let Some(index) = guidance.compressions_step_index {
            match steps.get(index) {
                None if !steps.is_empty() => self.add_error(
                    "guidance.compressions_step_index",
                    &format!(
                        "Index {index} is out of range for {} steps",
                        steps.len()
                    ),
                ),
                Some(step) if step.kind != StepKind::Compressions => self.add_error(
                    "guidance.compressions_step_index",
                    &format!("Step {index} is a timed step, not a compressions step"),
                ),
                _ => {}
            }
        }

        if let Some(delay) = &guidance.transition_delay {
            if let Err(e) = humantime::parse_duration(delay) {
                self.add_error(
                    "guidance.transition_delay",
                    &format!("Invalid duration '{delay}': {e}"),
                );
            }
        }

        if tempo > 0 && target > 0 {
            self.check_countdown_fits_target(steps, tempo, target);
        }
    }

    /// Warns when a compressions countdown reaches zero before the target
    /// count can be reached at the configured tempo.
    fn check_countdown_fits_target(&mut self, steps: &[StepDescriptor], tempo: u32, target: u32) {
        let needed = beat_interval(tempo) * target;
        for (i, step) in steps.iter().enumerate() {
            if step.kind != StepKind::Compressions {
                continue;
            }
            let countdown = Duration::from_secs(u64::from(step.duration_seconds));
            if countdown < needed {
                self.add_warning(
                    &format!("steps[{i}].duration_seconds"),
                    &format!(
                        "Countdown of {}s ends before {target} compressions at {tempo} BPM ({:.1}s)",
                        step.duration_seconds,
                        needed.as_secs_f64()
                    ),
                );
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

//! Step catalog
//!
//! The ordered, immutable list of steps the engine walks through. Content
//! fields (titles, instructions, narration) are carried for renderers and the
//! narration port; the engine only looks at the step kind and duration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// How a step decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Ends when its countdown expires.
    Timed,
    /// Ends when the compression count reaches the target; the countdown is
    /// display only.
    Compressions,
}

impl StepKind {
    /// Short label used in logs, metrics and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timed => "timed",
            Self::Compressions => "compressions",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single guidance step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDescriptor {
    /// Display identifier (1-based in the built-in catalog)
    pub id: u32,
    /// Step kind
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Countdown length in whole seconds; must be positive
    pub duration_seconds: u32,
    /// Text handed to the narration port on entry
    pub narration_text: String,
    /// Short heading for renderers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// On-screen instruction for renderers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl StepDescriptor {
    /// Creates a step without display content.
    #[must_use]
    pub fn new(id: u32, kind: StepKind, duration_seconds: u32, narration: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            duration_seconds,
            narration_text: narration.into(),
            title: None,
            instruction: None,
        }
    }

    /// Adds a title and instruction.
    #[must_use]
    pub fn with_content(mut self, title: impl Into<String>, instruction: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self.instruction = Some(instruction.into());
        self
    }
}

/// Validated, cheaply clonable step list.
///
/// Construction enforces: at least one step, every duration positive, and at
/// least one compressions step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCatalog {
    steps: Arc<[StepDescriptor]>,
}

impl StepCatalog {
    /// Validates and freezes a step list.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the list is empty, contains a zero
    /// duration, or has no compressions step.
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some((index, step)) = steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.duration_seconds == 0)
        {
            return Err(CatalogError::ZeroDuration { index, id: step.id });
        }
        if !steps.iter().any(|s| s.kind == StepKind::Compressions) {
            return Err(CatalogError::NoCompressionsStep);
        }
        Ok(Self {
            steps: steps.into(),
        })
    }

    /// The standard adult CPR sequence: four timed assessment steps, 30
    /// compressions, two rescue breaths.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            steps: builtin_steps().into(),
        }
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`; kept for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    /// All steps in order.
    #[must_use]
    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    /// Index of the first compressions step.
    #[must_use]
    pub fn first_compressions_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.kind == StepKind::Compressions)
    }

    /// Checks that `index` can serve as the cycle anchor.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::AnchorOutOfRange`] or
    /// [`CatalogError::AnchorNotCompressions`].
    pub fn check_anchor(&self, index: usize) -> Result<(), CatalogError> {
        match self.steps.get(index) {
            None => Err(CatalogError::AnchorOutOfRange {
                index,
                len: self.steps.len(),
            }),
            Some(step) if step.kind != StepKind::Compressions => {
                Err(CatalogError::AnchorNotCompressions { index })
            }
            Some(_) => Ok(()),
        }
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_steps() -> Vec<StepDescriptor> {
    vec![
        StepDescriptor::new(
            1,
            StepKind::Timed,
            10,
            "Step 1. Check responsiveness. Tap the person's shoulders firmly and shout, \
             Are you okay? Look for any signs of movement or response.",
        )
        .with_content(
            "Check Responsiveness",
            "Tap the person's shoulders firmly and shout: Are you okay?",
        ),
        StepDescriptor::new(
            2,
            StepKind::Timed,
            12,
            "Step 2. Call 9 1 1 immediately. Put the phone on speaker mode. \
             If someone is nearby, ask them to get an A E D.",
        )
        .with_content(
            "Call Emergency Services",
            "Call 911 immediately. Put the phone on speaker. Ask someone nearby to get an AED.",
        ),
        StepDescriptor::new(
            3,
            StepKind::Timed,
            8,
            "Step 3. Open the airway. Place one hand on the forehead and tilt the head back \
             gently. Lift the chin up with two fingers under the jaw bone.",
        )
        .with_content(
            "Open the Airway",
            "Tilt the head back gently. Lift the chin up with two fingers.",
        ),
        StepDescriptor::new(
            4,
            StepKind::Timed,
            10,
            "Step 4. Check for breathing. Look at the chest for any movement. \
             Listen and feel for breath. Do this for no more than 10 seconds.",
        )
        .with_content(
            "Check for Breathing",
            "Look at the chest for movement. Listen and feel for breath for no more than 10 seconds.",
        ),
        StepDescriptor::new(
            5,
            StepKind::Compressions,
            18,
            "Step 5. Begin chest compressions now. Place the heel of your hand on the center \
             of the chest. Interlock your fingers. Push hard and fast. 30 compressions at \
             120 beats per minute. Follow the beat.",
        )
        .with_content(
            "Perform Chest Compressions",
            "Place the heel of your hand on the center of the chest. Push hard and fast. \
             30 compressions at 120 BPM.",
        ),
        StepDescriptor::new(
            6,
            StepKind::Timed,
            12,
            "Step 6. Give 2 rescue breaths. Tilt the head back, pinch the nose shut, and seal \
             your mouth over theirs. Blow steadily for about 1 second each. Watch the chest rise.",
        )
        .with_content(
            "Give Rescue Breaths",
            "Tilt the head back. Pinch the nose shut. Give 2 breaths. Watch the chest rise.",
        ),
    ]
}

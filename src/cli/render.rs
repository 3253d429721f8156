//! Terminal rendering of guidance snapshots.

use std::io::Write;

use crate::guidance::{EnginePhase, GuidanceSnapshot, StepCatalog, StepKind};

/// Prints a header whenever the step changes and a status line whenever
/// anything else visible changes.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    catalog: StepCatalog,
    out: W,
    last: Option<GuidanceSnapshot>,
}

impl<W: Write> Renderer<W> {
    /// Creates a renderer for `catalog` writing to `out`.
    pub const fn new(catalog: StepCatalog, out: W) -> Self {
        Self {
            catalog,
            out,
            last: None,
        }
    }

    /// Renders `snapshot` if it differs from the last one rendered.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    pub fn render(&mut self, snapshot: &GuidanceSnapshot) -> std::io::Result<()> {
        if self.last.as_ref() == Some(snapshot) {
            return Ok(());
        }
        let step_changed = self
            .last
            .as_ref()
            .is_none_or(|last| {
                last.step_index != snapshot.step_index || last.cycle_count != snapshot.cycle_count
            });

        if step_changed {
            if let Some(header) = step_header(&self.catalog, snapshot) {
                writeln!(self.out)?;
                writeln!(self.out, "{header}")?;
                if let Some(instruction) = snapshot
                    .step_index
                    .and_then(|i| self.catalog.get(i))
                    .and_then(|s| s.instruction.as_deref())
                {
                    writeln!(self.out, "  {instruction}")?;
                }
            }
        }
        writeln!(self.out, "{}", status_line(snapshot))?;
        self.out.flush()?;
        self.last = Some(snapshot.clone());
        Ok(())
    }

    /// Consumes the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// `== Step 5/6: Perform Chest Compressions (cycle 2) ==`, or `None` when idle.
#[must_use]
pub fn step_header(catalog: &StepCatalog, snapshot: &GuidanceSnapshot) -> Option<String> {
    let index = snapshot.step_index?;
    let step = catalog.get(index)?;
    let title = step
        .title
        .clone()
        .unwrap_or_else(|| format!("Step {}", step.id));
    Some(format!(
        "== Step {}/{}: {title} (cycle {}) ==",
        index + 1,
        catalog.len(),
        snapshot.cycle_count
    ))
}

/// One-line summary of the observable state.
#[must_use]
pub fn status_line(snapshot: &GuidanceSnapshot) -> String {
    match snapshot.phase {
        EnginePhase::Idle => "  idle".to_string(),
        EnginePhase::Transitioning => "  ...".to_string(),
        EnginePhase::Paused => format!("  [paused] {}", progress(snapshot)),
        EnginePhase::StepActive => format!("  {}", progress(snapshot)),
    }
}

fn progress(snapshot: &GuidanceSnapshot) -> String {
    let time = format!("{:>2}s", snapshot.time_remaining_seconds);
    if snapshot.step_type != Some(StepKind::Compressions) {
        return time;
    }
    let mut line = format!(
        "{time}  compressions {}/{}",
        snapshot.compression_count, snapshot.target_compressions
    );
    if let Some(rhythm) = snapshot.rhythm {
        line.push_str(&format!("  {} bpm, {}", rhythm.bpm, rhythm.verdict.prompt()));
    }
    line
}

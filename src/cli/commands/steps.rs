//! `steps`: print the step catalog and the resolved settings.

use serde_json::json;

use super::load_config;
use crate::cli::args::{OutputFormat, StepsArgs};
use crate::config::{GuidanceOverrides, ResolvedConfig};
use crate::error::GuideError;

/// Print the catalog.
///
/// # Errors
///
/// Returns a configuration error when `--config` names an invalid file.
pub fn run(args: &StepsArgs) -> Result<(), GuideError> {
    let load_result = load_config(args.config.as_deref(), GuidanceOverrides::default())?;
    let config = load_result.config.as_ref();

    match args.format {
        OutputFormat::Human => print!("{}", render_human(config)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json(config))?),
    }
    Ok(())
}

fn render_human(config: &ResolvedConfig) -> String {
    let settings = &config.settings;
    let mut out = String::new();
    for (i, step) in config.catalog.steps().iter().enumerate() {
        let title = step.title.as_deref().unwrap_or("");
        out.push_str(&format!(
            "{:>2}. [{} {}s] {title}\n",
            i + 1,
            step.kind,
            step.duration_seconds
        ));
        if let Some(instruction) = &step.instruction {
            out.push_str(&format!("    {instruction}\n"));
        }
    }
    out.push_str(&format!(
        "\n{} compressions at {} BPM; cycle returns to step {}\n",
        settings.target_compressions,
        settings.tempo_bpm,
        settings.compressions_step_index + 1
    ));
    out
}

fn render_json(config: &ResolvedConfig) -> serde_json::Value {
    let settings = &config.settings;
    json!({
        "guidance": {
            "tempo_bpm": settings.tempo_bpm,
            "target_compressions": settings.target_compressions,
            "compressions_step_index": settings.compressions_step_index,
            "transition_delay_ms": u64::try_from(settings.transition_delay.as_millis()).unwrap_or(u64::MAX),
            "compression_source": settings.compression_source,
            "advance_on_narration": settings.advance_on_narration,
        },
        "steps": config.catalog.steps(),
    })
}

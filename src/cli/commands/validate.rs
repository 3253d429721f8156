//! `validate`: load configuration files and report issues.

use std::path::Path;

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadResult};
use crate::error::{ConfigError, GuideError, Severity, ValidationIssue};

/// Validate every file, report each outcome, and fail if any file failed.
///
/// # Errors
///
/// Returns the first failure after all files have been checked. With
/// `--strict`, warnings count as failures.
pub fn run(args: &ValidateArgs) -> Result<(), GuideError> {
    let loader = ConfigLoader::with_defaults();
    let mut first_error = None;
    let mut reports = Vec::new();

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let outcome = loader
            .load(path)
            .and_then(|result| enforce_strict(path, result, args.strict));

        match args.format {
            OutputFormat::Human => print_human(path, &outcome),
            OutputFormat::Json => reports.push(report_json(path, &outcome)),
        }
        if let Err(err) = outcome {
            first_error.get_or_insert(err);
        }
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    first_error.map_or(Ok(()), |err| Err(err.into()))
}

fn enforce_strict(path: &Path, result: LoadResult, strict: bool) -> Result<LoadResult, ConfigError> {
    if !strict || result.warnings.is_empty() {
        return Ok(result);
    }
    Err(ConfigError::ValidationError {
        path: path.display().to_string(),
        errors: result
            .warnings
            .into_iter()
            .map(|w| ValidationIssue {
                path: w.location.unwrap_or_default(),
                message: w.message,
                severity: Severity::Error,
            })
            .collect(),
    })
}

fn print_human(path: &Path, outcome: &Result<LoadResult, ConfigError>) {
    match outcome {
        Ok(result) => {
            println!("{}: ok ({} steps)", path.display(), result.config.catalog.len());
            for warning in &result.warnings {
                println!("  warning: {warning}");
            }
        }
        Err(err) => println!("{}: invalid: {err}", path.display()),
    }
}

fn report_json(path: &Path, outcome: &Result<LoadResult, ConfigError>) -> serde_json::Value {
    match outcome {
        Ok(result) => json!({
            "file": path.display().to_string(),
            "valid": true,
            "steps": result.config.catalog.len(),
            "warnings": result.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }),
        Err(err) => json!({
            "file": path.display().to_string(),
            "valid": false,
            "error": err.to_string(),
        }),
    }
}

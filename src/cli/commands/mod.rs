//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod run;
pub mod steps;
pub mod validate;
pub mod version;

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::{ConfigLoader, GuidanceOverrides, LoadResult, LoaderOptions};
use crate::error::{ConfigError, GuideError};

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `shutdown` is cancelled when the process receives SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, shutdown: CancellationToken) -> Result<(), GuideError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, shutdown).await,
        Commands::Steps(args) => steps::run(&args),
        Commands::Validate(args) => validate::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads `path`, or the built-in catalog when no path is given, and logs
/// any warnings.
fn load_config(
    path: Option<&Path>,
    overrides: GuidanceOverrides,
) -> Result<LoadResult, ConfigError> {
    let loader = ConfigLoader::new(LoaderOptions {
        overrides,
        ..LoaderOptions::default()
    });
    let load_result = match path {
        Some(path) => {
            tracing::info!(file = %path.display(), "loading configuration");
            loader.load(path)?
        }
        None => loader.load_builtin()?,
    };

    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    Ok(load_result)
}

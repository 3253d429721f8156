//! CLI argument definitions
//!
//! All Clap derive structs for `cpr-guide` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::GuidanceOverrides;
use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Step-by-step CPR guidance with countdowns, a compression metronome and
/// narration.
#[derive(Parser, Debug)]
#[command(name = "cpr-guide", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "CPR_GUIDE_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "CPR_GUIDE_LOG_FORMAT")]
    pub log_format: LogFormatChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an interactive guidance session.
    Run(RunArgs),

    /// Print the step catalog.
    Steps(StepsArgs),

    /// Validate configuration files without starting a session.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Run Command
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "CPR_GUIDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Compression tempo in beats per minute.
    #[arg(long, env = "CPR_GUIDE_TEMPO")]
    pub tempo: Option<u32>,

    /// Compressions per cycle.
    #[arg(long)]
    pub target: Option<u32>,

    /// Count compressions from taps instead of metronome beats.
    #[arg(long)]
    pub manual: bool,

    /// Let narration completion end timed steps.
    #[arg(long)]
    pub advance_on_narration: bool,

    /// Disable narration and the terminal bell.
    #[arg(long)]
    pub mute: bool,

    /// Write session events as JSON lines to this file.
    #[arg(long, env = "CPR_GUIDE_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on 127.0.0.1:<PORT>.
    #[arg(long, env = "CPR_GUIDE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl RunArgs {
    /// Command-line values that replace configured ones.
    #[must_use]
    pub const fn overrides(&self) -> GuidanceOverrides {
        GuidanceOverrides {
            tempo_bpm: self.tempo,
            target_compressions: self.target,
            manual: self.manual,
            advance_on_narration: self.advance_on_narration,
        }
    }
}

// ============================================================================
// Steps / Validate
// ============================================================================

/// Arguments for `steps`.
#[derive(Args, Debug)]
pub struct StepsArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "CPR_GUIDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log format choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatChoice {
    /// Human-readable lines.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Human => Self::Human,
            LogFormatChoice::Json => Self::Json,
        }
    }
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "cpr-guide",
            "run",
            "--tempo",
            "110",
            "--target",
            "15",
            "--manual",
            "--mute",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("Expected RunArgs");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.tempo_bpm, Some(110));
        assert_eq!(overrides.target_compressions, Some(15));
        assert!(overrides.manual);
        assert!(!overrides.advance_on_narration);
        assert!(args.mute);
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["cpr-guide", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("Expected RunArgs");
        };
        assert!(!args.manual);
        assert!(args.events_file.is_none());
    }

    #[test]
    fn test_help_output() {
        let result = Cli::try_parse_from(["cpr-guide", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let result = Cli::try_parse_from(["cpr-guide", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_non_numeric_tempo_rejected() {
        let result = Cli::try_parse_from(["cpr-guide", "run", "--tempo", "fast"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_files() {
        let result = Cli::try_parse_from(["cpr-guide", "validate"]);
        assert!(result.is_err(), "Expected error for missing files");
    }

    #[test]
    fn test_steps_json_format() {
        let cli = Cli::try_parse_from(["cpr-guide", "steps", "--format", "json"]).unwrap();
        let Commands::Steps(args) = cli.command else {
            panic!("Expected StepsArgs");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_completions_shells_parse() {
        for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["cpr-guide", "completions", shell]);
            assert!(cli.is_ok(), "Failed to parse shell={shell}");
        }
    }

    #[test]
    fn test_verbose_count_and_quiet() {
        let cli = Cli::try_parse_from(["cpr-guide", "-vvv", "--quiet", "steps"]).unwrap();
        assert_eq!(cli.verbose, 3);
        assert!(cli.quiet);
    }

    #[test]
    fn test_color_choices_parse() {
        for variant in ["auto", "always", "never"] {
            let cli = Cli::try_parse_from(["cpr-guide", "--color", variant, "steps"]);
            assert!(cli.is_ok(), "Failed to parse color={variant}");
        }
    }

    #[test]
    fn test_exit_code_mapping() {
        use crate::error::{ConfigError, EngineError, ExitCode, GuideError};

        let cases: Vec<(GuideError, i32)> = vec![
            (
                ConfigError::MissingFile {
                    path: PathBuf::from("/x"),
                }
                .into(),
                ExitCode::CONFIG_ERROR,
            ),
            (EngineError::Shutdown.into(), ExitCode::ENGINE_ERROR),
            (
                std::io::Error::other("disk").into(),
                ExitCode::IO_ERROR,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "wrong code for {err}");
        }
    }
}

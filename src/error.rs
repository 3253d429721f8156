//! Error types for `cpr-guide`
//!
//! Library errors are split by concern (configuration, catalog, engine,
//! side-effect ports) and aggregated into [`GuideError`] for the binary,
//! which maps each variant onto a process exit code.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `cpr-guide` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure, bad catalog)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Guidance engine error (engine loop gone)
    pub const ENGINE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `cpr-guide` operations.
#[derive(Debug, Error)]
pub enum GuideError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Step catalog rejected
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Guidance engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GuideError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Catalog(_) | Self::Json(_) | Self::Yaml(_) => {
                ExitCode::CONFIG_ERROR
            }
            Self::Engine(_) => ExitCode::ENGINE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}{}: {message}", line.map_or_else(String::new, |l| format!(" (line {l})")))]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("config file {path} is {size} bytes (limit: {limit})")]
    FileTooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Configuration file is empty
    #[error("config file {path} is empty")]
    Empty {
        /// Path to the configuration file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "steps[2].duration_seconds")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Catalog Errors
// ============================================================================

/// Reasons a step catalog, or the guidance settings that drive it, are
/// rejected at construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog has no steps
    #[error("step catalog is empty")]
    Empty,

    /// A step declares a zero duration
    #[error("step {index} (id {id}) has a zero duration")]
    ZeroDuration {
        /// Position of the step in the catalog
        index: usize,
        /// Declared step id
        id: u32,
    },

    /// No step has type `compressions`
    #[error("step catalog has no compressions step")]
    NoCompressionsStep,

    /// The cycle anchor does not exist
    #[error("compressions step index {index} is out of range for {len} steps")]
    AnchorOutOfRange {
        /// Configured anchor index
        index: usize,
        /// Number of steps in the catalog
        len: usize,
    },

    /// The cycle anchor is a timed step
    #[error("compressions step index {index} points at a timed step")]
    AnchorNotCompressions {
        /// Configured anchor index
        index: usize,
    },

    /// The metronome tempo is zero
    #[error("compression tempo must be greater than zero")]
    ZeroTempo,

    /// The compression target is zero
    #[error("target compressions must be greater than zero")]
    ZeroTarget,
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Guidance engine errors.
///
/// Invalid commands for the current state are not errors (they are no-ops);
/// the only failure a caller can observe is the engine loop being gone.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine loop has shut down and no longer accepts commands
    #[error("guidance engine is shut down")]
    Shutdown,

    /// The engine dropped the reply channel before answering
    #[error("guidance engine dropped the command reply")]
    ReplyDropped,
}

// ============================================================================
// Port Errors
// ============================================================================

/// Failures reported by narration and beep adapters.
///
/// The engine never surfaces these to the user: it logs them and carries on.
#[derive(Debug, Error)]
pub enum PortError {
    /// The underlying device or service is not available
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// Writing to the output device failed
    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `cpr-guide` operations.
pub type Result<T> = std::result::Result<T, GuideError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::ENGINE_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_engine_error_exit_code() {
        let err: GuideError = EngineError::Shutdown.into();
        assert_eq!(err.exit_code(), ExitCode::ENGINE_ERROR);
    }

    #[test]
    fn test_catalog_error_exit_code() {
        let err: GuideError = CatalogError::NoCompressionsStep.into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: GuideError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: GuideError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "steps[0].duration_seconds".to_string(),
            message: "duration must be positive".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: duration must be positive at steps[0].duration_seconds"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue {
            path: "guidance.tempo_bpm".to_string(),
            message: "tempo outside guideline".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(
            issue.to_string(),
            "warning: tempo outside guideline at guidance.tempo_bpm"
        );
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = ConfigError::ValidationError {
            path: "guide.yaml".to_string(),
            errors: vec![ValidationIssue {
                path: "steps".to_string(),
                message: "no compressions step".to_string(),
                severity: Severity::Error,
            }],
        };
        let text = err.to_string();
        assert!(text.contains("guide.yaml"));
        assert!(text.contains("no compressions step"));
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::AnchorOutOfRange { index: 9, len: 6 };
        assert_eq!(
            err.to_string(),
            "compressions step index 9 is out of range for 6 steps"
        );
    }
}

//! Configuration loader
//!
//! This module implements the configuration loading pipeline:
//! 1. Size check
//! 2. YAML parsing
//! 3. Deserialization to typed config
//! 4. Command-line and environment overrides
//! 5. Validation
//! 6. Resolution into a catalog and engine settings, frozen with `Arc`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{GuideConfig, GuidanceOverrides};
use crate::config::validation::Validator;
use crate::error::ConfigError;
use crate::guidance::{GuidanceSettings, StepCatalog};

/// Origin label used when no file is loaded.
const BUILTIN_ORIGIN: &str = "<builtin>";

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,

    /// Values that replace whatever the file says.
    pub overrides: GuidanceOverrides,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of steps.
    pub max_steps: usize,

    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_steps: env_or("CPR_GUIDE_MAX_STEPS", 64),
            max_config_size: env_or("CPR_GUIDE_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// A configuration ready to drive the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Validated step list.
    pub catalog: StepCatalog,

    /// Engine parameters with defaults filled in.
    pub settings: GuidanceSettings,
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<ResolvedConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
///
/// Handles the full loading pipeline from YAML file to frozen
/// [`ResolvedConfig`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - The file is empty
    /// - YAML parsing or deserialization fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = u64::try_from(self.options.config_limits.max_config_size).unwrap_or(u64::MAX);
        if metadata.len() > limit {
            return Err(ConfigError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let raw_content = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw_content, path)
    }

    /// Loads configuration from YAML text; `origin` is used in messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus file access.
    pub fn load_str(&self, content: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        // Handle UTF-8 BOM
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let root: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        if root.is_null() {
            return Err(ConfigError::Empty {
                path: origin.to_path_buf(),
            });
        }

        let config: GuideConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: None,
                message: format!("Failed to deserialize configuration: {e}"),
            })?;

        self.finish(config, &origin.display().to_string())
    }

    /// Resolves the built-in catalog and default settings, with overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when an override is invalid.
    pub fn load_builtin(&self) -> Result<LoadResult, ConfigError> {
        self.finish(GuideConfig::default(), BUILTIN_ORIGIN)
    }

    fn finish(&self, mut config: GuideConfig, origin: &str) -> Result<LoadResult, ConfigError> {
        self.options.overrides.apply(&mut config);

        let mut validator = Validator::new();
        let validation_result = validator.validate(&config, &self.options.config_limits);

        if validation_result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.to_string(),
                errors: validation_result.errors,
            });
        }

        let warnings = validation_result
            .warnings
            .into_iter()
            .map(|issue| LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            })
            .collect();

        Ok(LoadResult {
            config: Arc::new(resolve(config)?),
            warnings,
        })
    }
}

/// Builds the catalog and settings from a validated configuration.
fn resolve(config: GuideConfig) -> Result<ResolvedConfig, ConfigError> {
    let catalog = match config.steps {
        Some(steps) => StepCatalog::new(steps).map_err(|e| ConfigError::InvalidValue {
            field: "steps".to_string(),
            value: e.to_string(),
            expected: "a valid step list".to_string(),
        })?,
        None => StepCatalog::builtin(),
    };

    let guidance = config.guidance.unwrap_or_default();
    let defaults = GuidanceSettings::default();

    let compressions_step_index = match guidance.compressions_step_index {
        Some(index) => index,
        None => catalog
            .first_compressions_index()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "steps".to_string(),
                value: "no compressions step".to_string(),
                expected: "at least one compressions step".to_string(),
            })?,
    };

    let transition_delay = guidance
        .transition_delay
        .as_deref()
        .map(parse_delay)
        .transpose()?
        .unwrap_or(defaults.transition_delay);

    Ok(ResolvedConfig {
        catalog,
        settings: GuidanceSettings {
            tempo_bpm: guidance.tempo_bpm.unwrap_or(defaults.tempo_bpm),
            target_compressions: guidance
                .target_compressions
                .unwrap_or(defaults.target_compressions),
            compressions_step_index,
            transition_delay,
            compression_source: guidance.compression_source.unwrap_or_default(),
            advance_on_narration: guidance.advance_on_narration.unwrap_or(false),
        },
    })
}

fn parse_delay(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
        field: "guidance.transition_delay".to_string(),
        value: raw.to_string(),
        expected: format!("a duration such as 400ms ({e})"),
    })
}

/// Reads a numeric limit from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

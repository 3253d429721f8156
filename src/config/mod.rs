//! Configuration module
//!
//! Loads and validates guidance configuration files: the step catalog and
//! the engine parameters.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions, ResolvedConfig};
pub use schema::{GuideConfig, GuidanceOverrides, GuidanceSection};
pub use validation::{ValidationResult, Validator};

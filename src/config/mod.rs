//! Configuration for the policy builder.
//!
//! Settings are layered: built-in defaults, then an optional file, then
//! environment variables prefixed with `POLICY_BUILDER_` (nested keys joined
//! with `__`, e.g. `POLICY_BUILDER_OUTPUT__INDENT=4`).

use crate::policy::{Effect, PolicyDocument, PolicyMetadata, PolicyMode};
use crate::{Error, Result};

use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "POLICY_BUILDER";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session-start document
    pub template: TemplateConfig,
    /// JSON rendering
    pub output: OutputConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// The document a new editing session starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Initial display name
    pub display_name: String,
    /// Initial description
    pub description: String,
    /// Initial category
    pub category: String,
    /// Initial mode
    pub mode: PolicyMode,
    /// Initially selected effect
    pub effect: Effect,
}

/// JSON output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Spaces per indentation level
    pub indent: usize,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter; `RUST_LOG` takes precedence when set
    pub level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            description: String::new(),
            category: String::new(),
            mode: PolicyMode::All,
            effect: Effect::Audit,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// A missing file is not an error when no path is given; an explicit path
    /// must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.output.indent == 0 || self.output.indent > 8 {
            return Err(Error::config_key(
                format!("indent must be between 1 and 8, got {}", self.output.indent),
                "output.indent",
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::config_key(
                format!("unknown log level '{}'", self.logging.level),
                "logging.level",
            ));
        }

        Ok(())
    }
}

impl TemplateConfig {
    /// Build the session-start document.
    pub fn document(&self) -> PolicyDocument {
        let metadata = PolicyMetadata::new(self.display_name.clone())
            .with_description(self.description.clone())
            .with_category(self.category.clone())
            .with_mode(self.mode);
        PolicyDocument::from_template(metadata, self.effect)
    }
}

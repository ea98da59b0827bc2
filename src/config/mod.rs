//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BIB_INGEST_*` environment variables (`__` separates nested keys, e.g.
//! `BIB_INGEST_DUPLICATES__TITLE_THRESHOLD=0.9`).

pub mod file_config;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use file_config::{read_config_file, save_config, ConfigFileError};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "BIB_INGEST";

/// File name probed in the working directory
const LOCAL_CONFIG_FILE: &str = "bib-ingest.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Import settings
    #[serde(default)]
    pub import: ImportConfig,

    /// Duplicate detection thresholds
    #[serde(default)]
    pub duplicates: DuplicateConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Import configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Author recorded when an entry names none
    #[serde(default = "default_placeholder_author")]
    pub placeholder_author: String,

    /// Format to assume instead of detecting it ("bibtex", "csv", "json")
    #[serde(default)]
    pub default_format: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            placeholder_author: default_placeholder_author(),
            default_format: None,
        }
    }
}

fn default_placeholder_author() -> String {
    "Unknown".to_string()
}

/// Duplicate detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Minimum title similarity for a title-only match
    #[serde(default = "default_title_threshold")]
    pub title_threshold: f64,

    /// Minimum title similarity when author and year also agree
    #[serde(default = "default_context_threshold")]
    pub context_threshold: f64,

    /// Keep at most this many matches per candidate
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            title_threshold: default_title_threshold(),
            context_threshold: default_context_threshold(),
            max_results: None,
        }
    }
}

fn default_title_threshold() -> f64 {
    0.85
}

fn default_context_threshold() -> f64 {
    0.70
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" for structured output, anything else for human-readable
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Whether structured JSON log lines were requested
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

/// Load configuration from a file, with environment overrides on top
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from defaults and environment variables only
pub fn get_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Look for a configuration file in the usual places.
///
/// The working directory wins over the user config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bib-ingest").join("config.toml"))
        .filter(|path| path.is_file())
}

//! Configuration file support for bib-ingest.
//!
//! Plain TOML read/write of [`Config`], used to create a starter file and to
//! inspect one without environment overrides.
//!
//! # Configuration File Format
//!
//! ```toml
//! [import]
//! placeholder_author = "Unknown"
//! default_format = "bibtex"
//!
//! [duplicates]
//! title_threshold = 0.85
//! context_threshold = 0.70
//! max_results = 10
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use std::path::Path;

use super::Config;

/// Read a TOML configuration file as-is
pub fn read_config_file(path: &Path) -> Result<Config, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
}

/// Write a configuration to a TOML file, creating parent directories
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigFileError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

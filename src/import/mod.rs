//! Importers that turn external bibliography text into [`DraftRecord`]s.
//!
//! Three formats are supported:
//!
//! - [`bibtex`]: `@kind{key, field = value, ...}` markup
//! - [`csv`]: delimited text with a header row
//! - [`json`]: a JSON array of records in the [`DraftRecord`] shape
//!
//! Every importer applies the same policy: a unit (entry, row, array element)
//! without a usable title becomes an [`ImportError`] and the run continues; a
//! unit without authors gets the configured placeholder author. A run that
//! produces no records at all is reported as failed.
//!
//! # Example
//!
//! ```rust
//! use bib_ingest::import::{import, ImportOptions};
//! use bib_ingest::models::ImportFormat;
//!
//! let text = "@article{k1, title={Deep Learning}, author={Alice Smith and Bob Jones}, year={2016}}";
//! let result = import(text, ImportFormat::Bibtex, &ImportOptions::default());
//! assert!(result.success);
//! assert_eq!(result.records[0].authors, vec!["Alice Smith", "Bob Jones"]);
//! ```

pub mod bibtex;
pub mod csv;
pub mod json;

use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::models::{DraftRecord, ImportError, ImportFormat, ImportResult};

/// Settings shared by all importers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Author recorded when a unit names none
    pub placeholder_author: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            placeholder_author: "Unknown".to_string(),
        }
    }
}

impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            placeholder_author: config.placeholder_author.clone(),
        }
    }
}

impl ImportOptions {
    /// Give an author-less record the placeholder author
    pub(crate) fn fill_authors(&self, record: &mut DraftRecord) {
        if record.authors.is_empty() {
            record.authors.push(self.placeholder_author.clone());
        }
    }
}

/// Why a single unit of input could not become a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Field '{field}' has no value")]
    MissingValue { field: String },

    #[error("Value of field '{field}' is not terminated")]
    UnterminatedValue { field: String },

    #[error("Entry is not terminated")]
    UnterminatedEntry,

    #[error("Malformed row: {0}")]
    Malformed(String),
}

impl ConversionError {
    /// Name of the field the failure concerns, empty when there is none
    pub fn field(&self) -> &str {
        match self {
            ConversionError::MissingTitle => "title",
            ConversionError::MissingValue { field }
            | ConversionError::UnterminatedValue { field } => field,
            ConversionError::UnterminatedEntry | ConversionError::Malformed(_) => "",
        }
    }

    /// Attach a position to the failure
    pub fn at(self, row: usize) -> ImportError {
        ImportError::new(row, self.field(), self.to_string())
    }
}

/// Import `text` in the given format
pub fn import(text: &str, format: ImportFormat, options: &ImportOptions) -> ImportResult {
    let result = match format {
        ImportFormat::Bibtex => bibtex::parse(text, options),
        ImportFormat::Csv => csv::parse(text, options),
        ImportFormat::Json => json::parse(text, options),
    };
    log_summary(format, &result);
    result
}

/// Import `text`, guessing its format from the content
pub fn import_auto(text: &str, options: &ImportOptions) -> ImportResult {
    import(text, ImportFormat::detect(text), options)
}

fn log_summary(format: ImportFormat, result: &ImportResult) {
    for error in result.errors.iter().filter(|e| e.row > 0) {
        warn!(format = %format, "Skipped {}", error);
    }

    match result.failure_message() {
        Some(message) => warn!(format = %format, "Import failed: {}", message),
        None => info!(
            format = %format,
            total = result.total_records,
            imported = result.imported_count,
            skipped = result.skipped_count,
            "Import finished"
        ),
    }
}

//! Import outcome types: per-item errors and the overall result of one import run.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::DraftRecord;
use crate::import::bibtex;

/// Input formats understood by the importers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    /// BibTeX bibliography markup
    Bibtex,
    /// Delimited text with a header row
    Csv,
    /// JSON array of records
    Json,
}

impl ImportFormat {
    /// Returns the display name of the format
    pub fn name(&self) -> &'static str {
        match self {
            ImportFormat::Bibtex => "BibTeX",
            ImportFormat::Csv => "CSV",
            ImportFormat::Json => "JSON",
        }
    }

    /// Look up a format by name or file extension, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bib" | "bibtex" => Some(ImportFormat::Bibtex),
            "csv" | "tsv" => Some(ImportFormat::Csv),
            "json" => Some(ImportFormat::Json),
            _ => None,
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_name(path.extension()?.to_str()?)
    }

    /// Guess the format from the content itself.
    ///
    /// A leading `[` means JSON. A first line starting with `@` or `%`, or any
    /// `@kind{` entry in the text, means BibTeX. Anything else is treated as
    /// delimited text.
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('[') {
            return ImportFormat::Json;
        }
        let first_line = trimmed.lines().next().unwrap_or_default();
        if first_line.trim_start().starts_with('@') || first_line.trim_start().starts_with('%') {
            return ImportFormat::Bibtex;
        }
        let has_delimiter = first_line.contains(',') || first_line.contains(';');
        if !has_delimiter && !bibtex::scan(trimmed).is_empty() {
            return ImportFormat::Bibtex;
        }
        ImportFormat::Csv
    }
}

impl std::fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One failed unit of input (an entry, a row or a list element)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    /// 1-based position of the unit; 0 for run-level failures
    pub row: usize,

    /// Citation key, when the unit had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Offending field, empty when the failure is not tied to one
    #[serde(default)]
    pub field: String,

    pub message: String,
}

impl ImportError {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            key: None,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attach the citation key of the failing entry
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.key = Some(key);
        }
        self
    }

    /// A failure that concerns the whole input rather than one unit
    pub fn run_level(message: impl Into<String>) -> Self {
        Self::new(0, "", message)
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.key, self.field.is_empty()) {
            (Some(key), true) => write!(f, "row {} ({}): {}", self.row, key, self.message),
            (Some(key), false) => write!(
                f,
                "row {} ({}), field {}: {}",
                self.row, key, self.field, self.message
            ),
            (None, true) => write!(f, "row {}: {}", self.row, self.message),
            (None, false) => write!(f, "row {}, field {}: {}", self.row, self.field, self.message),
        }
    }
}

/// Outcome of one import invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// True when at least one record was produced
    pub success: bool,

    /// Number of input units attempted, whatever their outcome
    pub total_records: usize,

    /// Number of records produced
    pub imported_count: usize,

    /// Number of attempted units that did not become records
    pub skipped_count: usize,

    /// Number of entries in `errors`
    pub error_count: usize,

    pub errors: Vec<ImportError>,

    pub records: Vec<DraftRecord>,
}

impl ImportResult {
    /// Partition per-unit outcomes into records and errors and derive the counters.
    ///
    /// `total` is the number of units attempted; it is passed separately because
    /// some units (skipped envelopes) never produce an outcome.
    pub fn from_outcomes<I>(total: usize, outcomes: I) -> Self
    where
        I: IntoIterator<Item = Result<DraftRecord, ImportError>>,
    {
        let (records, errors): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);
        let records: Vec<DraftRecord> = records.into_iter().filter_map(Result::ok).collect();
        let errors: Vec<ImportError> = errors.into_iter().filter_map(Result::err).collect();

        let mut result = Self {
            success: false,
            total_records: total,
            imported_count: 0,
            skipped_count: 0,
            error_count: 0,
            errors,
            records,
        };
        result.refresh_counts();
        result
    }

    /// Whole-input failure with a single explanatory message and no records
    pub fn failed(message: impl Into<String>) -> Self {
        let mut result = Self::default();
        result.fail(message);
        result
    }

    /// Turn this result into a run-level failure, keeping any per-unit errors
    pub fn fail(&mut self, message: impl Into<String>) {
        self.records.clear();
        self.errors.push(ImportError::run_level(message));
        self.refresh_counts();
    }

    /// The run-level message, if the run failed as a whole
    pub fn failure_message(&self) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.row == 0)
            .map(|e| e.message.as_str())
    }

    fn refresh_counts(&mut self) {
        self.imported_count = self.records.len();
        self.error_count = self.errors.len();
        self.skipped_count = self.total_records.saturating_sub(self.imported_count);
        self.success = self.imported_count > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_outcomes_counts() {
        let outcomes = vec![
            Ok(DraftRecord::new("A")),
            Err(ImportError::new(3, "title", "Title is required")),
            Ok(DraftRecord::new("B")),
        ];
        let result = ImportResult::from_outcomes(3, outcomes);

        assert!(result.success);
        assert_eq!(result.total_records, 3);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.records[1].title, "B");
        assert_eq!(result.failure_message(), None);
    }

    #[test]
    fn test_fail_keeps_item_errors() {
        let mut result = ImportResult::from_outcomes(
            1,
            vec![Err(ImportError::new(1, "", "broken").with_key("k1"))],
        );
        assert!(!result.success);
        result.fail("nothing usable");

        assert_eq!(result.error_count, 2);
        assert_eq!(result.failure_message(), Some("nothing usable"));
        assert_eq!(result.errors[0].key.as_deref(), Some("k1"));
    }

    #[test]
    fn test_failed_result() {
        let result = ImportResult::failed("empty");
        assert!(!result.success);
        assert_eq!(result.total_records, 0);
        assert_eq!(result.error_count, 1);
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_result_json_shape() {
        let result = ImportResult::failed("empty");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["totalRecords"], 0);
        assert_eq!(value["errorCount"], 1);
        assert_eq!(value["errors"][0]["row"], 0);
        assert_eq!(value["errors"][0]["field"], "");
        assert!(value["errors"][0].get("key").is_none());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImportFormat::from_path(Path::new("refs.BIB")), Some(ImportFormat::Bibtex));
        assert_eq!(ImportFormat::from_path(Path::new("a/b.csv")), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::from_path(Path::new("x.json")), Some(ImportFormat::Json));
        assert_eq!(ImportFormat::from_path(Path::new("x.txt")), None);
        assert_eq!(ImportFormat::from_path(Path::new("noext")), None);

        assert_eq!(ImportFormat::from_name(" BibTeX "), Some(ImportFormat::Bibtex));
        assert_eq!(ImportFormat::from_name("ris"), None);
    }

    #[test]
    fn test_format_detect() {
        assert_eq!(ImportFormat::detect("  [{\"title\": \"x\"}]"), ImportFormat::Json);
        assert_eq!(ImportFormat::detect("@article{k, title={x}}"), ImportFormat::Bibtex);
        assert_eq!(
            ImportFormat::detect("% exported\n@book{k, title={x}}"),
            ImportFormat::Bibtex
        );
        assert_eq!(
            ImportFormat::detect("Title,Authors\nX,someone@example.org"),
            ImportFormat::Csv
        );
        assert_eq!(
            ImportFormat::detect("Title\nContact me@example.org\n"),
            ImportFormat::Csv
        );
        assert_eq!(
            ImportFormat::detect("Exported references\n\n@article{k, title={x}}"),
            ImportFormat::Bibtex
        );
    }
}

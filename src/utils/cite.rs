//! Citation formatting and export.
//!
//! Supports IEEE and APA one-line references, plus whole-collection export
//! to BibTeX, CSV and JSON in shapes the importers read back.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::import::csv::HEADER;
use crate::models::{DraftRecord, EntryKind};

/// Citation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// IEEE numeric style
    #[default]
    Ieee,
    /// APA 7th edition
    Apa,
}

/// Errors that can occur while exporting
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(String),
}

/// Format a record citation in the specified style
pub fn format_citation(record: &DraftRecord, style: CitationStyle) -> String {
    match style {
        CitationStyle::Ieee => format_ieee(record),
        CitationStyle::Apa => format_apa(record),
    }
}

/// Format: A. Author, B. Author, "Title," Venue, vol. 1, no. 2, pp. 3-4, Mon Year, doi: X.
fn format_ieee(record: &DraftRecord) -> String {
    let mut parts = Vec::new();

    match record.authors.as_slice() {
        [] => {}
        [first, _, _, _, ..] => parts.push(format!("{} et al.", first)),
        authors => parts.push(authors.join(", ")),
    }

    if !record.title.is_empty() {
        parts.push(format!("\"{}\"", record.title));
    }

    if let Some(venue) = &record.venue {
        let prefix = if record.kind == EntryKind::ConferencePaper {
            "in "
        } else {
            ""
        };
        parts.push(format!("{}{}", prefix, venue));
    }

    if let Some(volume) = &record.volume {
        match &record.issue {
            Some(issue) => parts.push(format!("vol. {}, no. {}", volume, issue)),
            None => parts.push(format!("vol. {}", volume)),
        }
    }

    if let Some(pages) = &record.pages {
        parts.push(format!("pp. {}", pages));
    }

    if let Some(year) = record.year {
        match record.month {
            Some(month) => parts.push(format!("{} {}", month, year)),
            None => parts.push(year.to_string()),
        }
    }

    if let Some(doi) = &record.doi {
        parts.push(format!("doi: {}", doi));
    }

    format!("{}.", parts.join(", "))
}

/// "Given Middle Family" as "Family, G. M."
fn apa_author(author: &str) -> String {
    let words: Vec<&str> = author.split_whitespace().collect();
    match words.split_last() {
        Some((family, given)) if !given.is_empty() => {
            let initials: Vec<String> = given
                .iter()
                .filter_map(|n| n.chars().next())
                .map(|c| format!("{}.", c))
                .collect();
            format!("{}, {}", family, initials.join(" "))
        }
        _ => author.to_string(),
    }
}

/// Format: Family, G. (Year). Title. *Venue*. *Vol*(Issue). Pages. https://doi.org/X
fn format_apa(record: &DraftRecord) -> String {
    let mut parts = Vec::new();

    if !record.authors.is_empty() {
        let authors: Vec<String> = record.authors.iter().map(|a| apa_author(a)).collect();
        parts.push(authors.join(", "));
    }

    if let Some(year) = record.year {
        parts.push(format!("({})", year));
    }

    if !record.title.is_empty() {
        parts.push(record.title.clone());
    }

    if let Some(venue) = &record.venue {
        parts.push(format!("*{}*", venue));
    }

    if let Some(volume) = &record.volume {
        match &record.issue {
            Some(issue) => parts.push(format!("*{}*({})", volume, issue)),
            None => parts.push(format!("*{}*", volume)),
        }
    }

    if let Some(pages) = &record.pages {
        parts.push(pages.clone());
    }

    if let Some(doi) = &record.doi {
        parts.push(format!("https://doi.org/{}", doi));
    }

    parts.join(". ")
}

fn escape_bibtex(value: &str) -> String {
    value.replace('&', "\\&").replace('%', "\\%")
}

/// Citation key: first author's last name, year (or 0000), first title word, position
fn bibtex_key(record: &DraftRecord, index: usize) -> String {
    let alphanumeric = |s: &str| -> String { s.chars().filter(|c| c.is_alphanumeric()).collect() };

    let author = record
        .authors
        .first()
        .and_then(|a| a.split_whitespace().last())
        .map(alphanumeric)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let year = record
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "0000".to_string());
    let word = record
        .title
        .split_whitespace()
        .next()
        .map(|w| alphanumeric(w).to_lowercase())
        .filter(|w| !w.is_empty())
        .unwrap_or_else(|| "ref".to_string());

    format!("{}{}{}_{}", author, year, word, index)
}

/// Generate a BibTeX entry
fn format_bibtex(record: &DraftRecord, index: usize) -> String {
    let mut fields: Vec<(&str, String)> = vec![
        ("title", escape_bibtex(&record.title)),
        (
            "author",
            record
                .authors
                .iter()
                .map(|a| escape_bibtex(a))
                .collect::<Vec<_>>()
                .join(" and "),
        ),
    ];

    let mut optional = |name: &'static str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            fields.push((name, escape_bibtex(&value)));
        }
    };

    optional("year", record.year.map(|y| y.to_string()));
    optional("month", record.month.map(|m| m.abbrev().to_string()));
    let venue_field = if record.kind == EntryKind::ConferencePaper {
        "booktitle"
    } else {
        "journal"
    };
    optional(venue_field, record.venue.clone());
    optional("volume", record.volume.clone());
    optional("number", record.issue.clone());
    optional("pages", record.pages.clone());
    optional("publisher", record.publisher.clone());
    optional("doi", record.doi.clone());
    optional("url", record.url.clone());
    optional("isbn", record.isbn.clone());
    optional("abstract", record.abstract_text.clone());
    optional("note", record.notes.clone());
    optional("keywords", Some(record.tags.join(", ")));

    let body: Vec<String> = fields
        .iter()
        .map(|(name, value)| format!("  {} = {{{}}},", name, value))
        .collect();

    format!(
        "@{}{{{},\n{}\n}}\n",
        record.kind.bibtex_type(),
        bibtex_key(record, index),
        body.join("\n")
    )
}

/// Export records as BibTeX, one entry per record separated by blank lines
pub fn export_bibtex(records: &[DraftRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| format_bibtex(record, i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Export records as CSV with the importer's preferred header names
pub fn export_csv(records: &[DraftRecord]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer
        .write_record(HEADER)
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    for record in records {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        writer
            .write_record([
                record.title.clone(),
                record.authors.join("; "),
                record.kind.id().to_string(),
                text(&record.venue),
                text(&record.volume),
                text(&record.issue),
                text(&record.pages),
                record.year.map(|y| y.to_string()).unwrap_or_default(),
                record
                    .month
                    .map(|m| m.abbrev().to_string())
                    .unwrap_or_default(),
                text(&record.publisher),
                text(&record.doi),
                text(&record.url),
                text(&record.isbn),
                text(&record.abstract_text),
                text(&record.notes),
                record.tags.join("; "),
            ])
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

/// Export records as a pretty-printed JSON array
pub fn export_json(records: &[DraftRecord]) -> Result<String, ExportError> {
    serde_json::to_string_pretty(records).map_err(|e| ExportError::Json(e.to_string()))
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationStyle::Ieee => write!(f, "IEEE"),
            CitationStyle::Apa => write!(f, "APA 7th"),
        }
    }
}

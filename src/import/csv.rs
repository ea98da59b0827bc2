//! Delimited-text importer.
//!
//! The first row names the columns. Each logical field accepts a few header
//! spellings (see [`COLUMNS`]); unknown columns are ignored and missing ones
//! leave the field empty.

use std::collections::HashMap;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::models::{DraftRecord, EntryKind, ImportError, ImportResult};
use crate::utils::{clean_doi, normalize_month, split_list, split_unique};

use super::{ConversionError, ImportOptions};

const NO_ROWS: &str = "No records found in CSV";
const NOTHING_IMPORTED: &str = "None of the CSV rows could be imported";

/// Logical fields of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Title,
    Authors,
    Kind,
    Venue,
    Volume,
    Issue,
    Pages,
    Year,
    Month,
    Publisher,
    Doi,
    Url,
    Isbn,
    Abstract,
    Notes,
    Tags,
}

/// Header names accepted for each field, in preference order
const COLUMNS: &[(Column, &[&str])] = &[
    (Column::Title, &["Title", "title"]),
    (Column::Authors, &["Authors", "authors", "Author"]),
    (Column::Kind, &["Type", "type"]),
    (Column::Venue, &["Journal", "Conference", "journal"]),
    (Column::Volume, &["Volume", "volume"]),
    (Column::Issue, &["Issue", "issue"]),
    (Column::Pages, &["Pages", "pages"]),
    (Column::Year, &["Year", "year"]),
    (Column::Month, &["Month", "month"]),
    (Column::Publisher, &["Publisher", "publisher"]),
    (Column::Doi, &["DOI", "doi"]),
    (Column::Url, &["URL", "url"]),
    (Column::Isbn, &["ISBN", "isbn"]),
    (Column::Abstract, &["Abstract", "abstract"]),
    (Column::Notes, &["Notes", "notes"]),
    (Column::Tags, &["Tags", "tags"]),
];

/// Header row written on export; every name is the preferred spelling above
pub const HEADER: [&str; 16] = [
    "Title", "Authors", "Type", "Journal", "Volume", "Issue", "Pages", "Year", "Month",
    "Publisher", "DOI", "URL", "ISBN", "Abstract", "Notes", "Tags",
];

/// Position of each known field in the header row
#[derive(Debug, Default)]
struct Columns(HashMap<Column, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut columns = HashMap::new();
        for (column, names) in COLUMNS {
            // Exact spellings first, then any casing of them
            let found = names.iter().find_map(|name| position(*name)).or_else(|| {
                headers
                    .iter()
                    .position(|h| names.iter().any(|name| h.eq_ignore_ascii_case(name)))
            });
            if let Some(index) = found {
                columns.insert(*column, index);
            }
        }
        Self(columns)
    }

    /// Trimmed, non-empty value of `column` in `row`
    fn get<'r>(&self, row: &'r StringRecord, column: Column) -> Option<&'r str> {
        self.0
            .get(&column)
            .and_then(|index| row.get(*index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Parse every data row in `text`
pub fn parse(text: &str, options: &ImportOptions) -> ImportResult {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let columns = match reader.headers() {
        Ok(headers) => Columns::from_headers(headers),
        Err(e) => return ImportResult::failed(format!("Failed to read CSV header: {}", e)),
    };
    if !columns.0.contains_key(&Column::Title) {
        debug!("CSV header has no title column");
    }

    // The header is row 1
    let outcomes: Vec<Result<DraftRecord, ImportError>> = reader
        .records()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|e| ConversionError::Malformed(e.to_string()))
                .and_then(|row| convert(&row, &columns, options))
                .map_err(|e| e.at(index + 2))
        })
        .collect();

    if outcomes.is_empty() {
        return ImportResult::failed(NO_ROWS);
    }

    let mut result = ImportResult::from_outcomes(outcomes.len(), outcomes);
    if !result.success {
        result.fail(NOTHING_IMPORTED);
    }
    result
}

/// Tab or semicolon when the header uses it instead of commas
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.contains(',') {
        b','
    } else if header.contains('\t') {
        b'\t'
    } else if header.contains(';') {
        b';'
    } else {
        b','
    }
}

fn convert(
    row: &StringRecord,
    columns: &Columns,
    options: &ImportOptions,
) -> Result<DraftRecord, ConversionError> {
    let get = |column| columns.get(row, column);
    let owned = |column| get(column).map(str::to_string);

    let title = get(Column::Title).ok_or(ConversionError::MissingTitle)?;

    let mut record = DraftRecord {
        title: title.to_string(),
        authors: get(Column::Authors).map(split_list).unwrap_or_default(),
        kind: get(Column::Kind)
            .map(EntryKind::from_name)
            .unwrap_or_default(),
        venue: owned(Column::Venue),
        volume: owned(Column::Volume),
        issue: owned(Column::Issue),
        pages: owned(Column::Pages),
        year: get(Column::Year).and_then(|y| y.parse().ok()),
        month: get(Column::Month).and_then(normalize_month),
        publisher: owned(Column::Publisher),
        doi: get(Column::Doi).and_then(clean_doi),
        url: owned(Column::Url),
        isbn: owned(Column::Isbn),
        abstract_text: owned(Column::Abstract),
        notes: owned(Column::Notes),
        tags: get(Column::Tags).map(split_unique).unwrap_or_default(),
    };

    options.fill_authors(&mut record);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Month;

    fn options() -> ImportOptions {
        ImportOptions::default()
    }

    #[test]
    fn test_parse_rows() {
        let text = "\
Title,Authors,Type,Journal,Year,Month,DOI,Tags,Pages
Deep Learning,\"Alice Smith; Bob Jones\",article,Nature,2016,May,https://doi.org/10.1/DL,\"ml, nets; ml\",1-10
\"Graphs, Again\",Carol White,ConferencePaper,,n.d.,13,,,
";
        let result = parse(text, &options());

        assert!(result.success);
        assert_eq!(result.total_records, 2);
        assert_eq!(result.imported_count, 2);

        let first = &result.records[0];
        assert_eq!(first.title, "Deep Learning");
        assert_eq!(first.authors, vec!["Alice Smith", "Bob Jones"]);
        assert_eq!(first.kind, EntryKind::Article);
        assert_eq!(first.venue.as_deref(), Some("Nature"));
        assert_eq!(first.year, Some(2016));
        assert_eq!(first.month, Some(Month::May));
        assert_eq!(first.doi.as_deref(), Some("10.1/DL"));
        assert_eq!(first.tags, vec!["ml", "nets"]);
        assert_eq!(first.pages.as_deref(), Some("1-10"));

        let second = &result.records[1];
        assert_eq!(second.title, "Graphs, Again");
        assert_eq!(second.kind, EntryKind::ConferencePaper);
        assert_eq!(second.venue, None);
        assert_eq!(second.year, None);
        assert_eq!(second.month, None);
        assert!(second.tags.is_empty());
    }

    #[test]
    fn test_empty_title_row_is_skipped() {
        let text = "Title,Authors\nFirst,A B\n  ,C D\nThird,\n";
        let result = parse(text, &options());

        assert!(result.success);
        assert_eq!(result.total_records, 3);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].row, 3);
        assert_eq!(result.errors[0].field, "title");
        assert!(result.records.iter().all(|r| !r.title.is_empty()));

        // No authors: placeholder
        assert_eq!(result.records[1].title, "Third");
        assert_eq!(result.records[1].authors, vec!["Unknown"]);
    }

    #[test]
    fn test_column_alternates() {
        let text = "title,Author,Conference,journal,type,doi\nX,Solo Writer,ICML,Ignored,tech-report,10.5/x\n";
        let result = parse(text, &options());
        let r = &result.records[0];

        assert_eq!(r.authors, vec!["Solo Writer"]);
        // "Conference" comes before "journal" in preference order
        assert_eq!(r.venue.as_deref(), Some("ICML"));
        assert_eq!(r.kind, EntryKind::TechReport);
        assert_eq!(r.doi.as_deref(), Some("10.5/x"));

        let text = "TITLE,AUTHORS\nShouting,Loud Person\n";
        let result = parse(text, &options());
        assert_eq!(result.records[0].title, "Shouting");
        assert_eq!(result.records[0].authors, vec!["Loud Person"]);
    }

    #[test]
    fn test_quoted_multiline_and_ragged_rows() {
        let text = "Title,Abstract,Year\n\"Multi\",\"line one\nline two\",2001\nShort\n";
        let result = parse(text, &options());

        assert_eq!(result.imported_count, 2);
        assert_eq!(result.records[0].abstract_text.as_deref(), Some("line one\nline two"));
        assert_eq!(result.records[0].year, Some(2001));
        assert_eq!(result.records[1].title, "Short");
        assert_eq!(result.records[1].year, None);
    }

    #[test]
    fn test_other_delimiters() {
        assert_eq!(sniff_delimiter("Title\tAuthors\n"), b'\t');
        assert_eq!(sniff_delimiter("Title;Authors\n"), b';');
        assert_eq!(sniff_delimiter("Title,Tags;x\n"), b',');

        let result = parse("Title\tYear\nTabbed\t1999\n", &options());
        assert_eq!(result.records[0].title, "Tabbed");
        assert_eq!(result.records[0].year, Some(1999));
    }

    #[test]
    fn test_run_level_failures() {
        let result = parse("", &options());
        assert!(!result.success);
        assert_eq!(result.failure_message(), Some(NO_ROWS));

        let result = parse("Title,Authors\n", &options());
        assert_eq!(result.failure_message(), Some(NO_ROWS));

        let result = parse("Authors\nA B\nC D\n", &options());
        assert!(!result.success);
        assert_eq!(result.total_records, 2);
        assert_eq!(result.error_count, 3);
        assert_eq!(result.failure_message(), Some(NOTHING_IMPORTED));
    }
}

//! JSON importer.
//!
//! Input is an array of objects already in the [`DraftRecord`] shape. Each
//! element is decoded on its own so one malformed element does not take the
//! rest down with it.

use serde_json::Value;

use crate::models::{DraftRecord, ImportResult};
use crate::utils::clean_doi;

use super::{ConversionError, ImportOptions};

const NO_RECORDS: &str = "No records found in JSON";
const NOTHING_IMPORTED: &str = "None of the JSON records could be imported";

/// Parse a JSON array of records
pub fn parse(text: &str, options: &ImportOptions) -> ImportResult {
    let elements = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(elements)) => elements,
        Ok(_) => {
            return ImportResult::failed("Failed to parse JSON: expected an array of records")
        }
        Err(e) => return ImportResult::failed(format!("Failed to parse JSON: {}", e)),
    };
    if elements.is_empty() {
        return ImportResult::failed(NO_RECORDS);
    }

    let total = elements.len();
    let outcomes = elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| convert(element, options).map_err(|e| e.at(index + 1)));

    let mut result = ImportResult::from_outcomes(total, outcomes);
    if !result.success {
        result.fail(NOTHING_IMPORTED);
    }
    result
}

fn convert(element: Value, options: &ImportOptions) -> Result<DraftRecord, ConversionError> {
    let mut record: DraftRecord =
        serde_json::from_value(element).map_err(|e| ConversionError::Malformed(e.to_string()))?;

    record.title = record.title.trim().to_string();
    if record.title.is_empty() {
        return Err(ConversionError::MissingTitle);
    }

    record.authors = std::mem::take(&mut record.authors)
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    options.fill_authors(&mut record);

    let tags = std::mem::take(&mut record.tags);
    for tag in tags {
        record.add_tag(tag);
    }

    record.doi = record.doi.as_deref().and_then(clean_doi);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, Month};

    fn options() -> ImportOptions {
        ImportOptions::default()
    }

    #[test]
    fn test_parse_records() {
        let text = r#"[
            {
                "title": "  Deep Learning ",
                "authors": ["Alice Smith", " ", "Bob Jones"],
                "type": "article",
                "journalOrConference": "Nature",
                "year": 2016,
                "month": "5",
                "doi": "doi:10.1/DL",
                "tags": ["ml", "ml", " nets "]
            },
            {"title": "Bare"}
        ]"#;
        let result = parse(text, &options());

        assert!(result.success);
        assert_eq!(result.total_records, 2);
        assert_eq!(result.imported_count, 2);

        let first = &result.records[0];
        assert_eq!(first.title, "Deep Learning");
        assert_eq!(first.authors, vec!["Alice Smith", "Bob Jones"]);
        assert_eq!(first.kind, EntryKind::Article);
        assert_eq!(first.venue.as_deref(), Some("Nature"));
        assert_eq!(first.month, Some(Month::May));
        assert_eq!(first.doi.as_deref(), Some("10.1/DL"));
        assert_eq!(first.tags, vec!["ml", "nets"]);

        let second = &result.records[1];
        assert_eq!(second.authors, vec!["Unknown"]);
        assert!(second.tags.is_empty());
        assert_eq!(second.kind, EntryKind::Other);
    }

    #[test]
    fn test_item_errors_use_one_based_rows() {
        let text = r#"[{"title": "Ok"}, {"title": "   "}, {"authors": ["X"]}, "not an object", {"title": "Ok too", "year": "soon"}]"#;
        let result = parse(text, &options());

        assert!(result.success);
        assert_eq!(result.total_records, 5);
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.skipped_count, 3);

        let rows: Vec<usize> = result.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert_eq!(result.errors[0].field, "title");
        assert_eq!(result.errors[1].field, "title");
        assert_eq!(result.errors[2].field, "");

        // A year that is not a number degrades to absent
        assert_eq!(result.records[1].title, "Ok too");
        assert_eq!(result.records[1].year, None);
    }

    #[test]
    fn test_lenient_kind_and_year() {
        let text = r#"[
            {"title": "A", "type": "Article", "year": "2016"},
            {"title": "B", "type": 0, "year": "c. 1998"},
            {"title": "C", "type": 1, "year": 2001.5},
            {"title": "D", "type": "InProceedings", "year": null},
            {"title": "E", "type": 42, "year": [2020]},
            {"title": "F", "kind": {"nested": true}, "year": " 1999 "}
        ]"#;
        let result = parse(text, &options());

        assert_eq!(result.imported_count, 6);
        assert_eq!(result.error_count, 0);

        let kinds: Vec<EntryKind> = result.records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Article,
                EntryKind::Article,
                EntryKind::ConferencePaper,
                EntryKind::ConferencePaper,
                EntryKind::Other,
                EntryKind::Other,
            ]
        );

        let years: Vec<Option<i32>> = result.records.iter().map(|r| r.year).collect();
        assert_eq!(
            years,
            vec![Some(2016), Some(1998), None, None, None, Some(1999)]
        );
    }

    #[test]
    fn test_ordinal_kinds_follow_declaration_order() {
        for (index, kind) in EntryKind::ALL.iter().enumerate() {
            let text = format!(r#"[{{"title": "X", "type": {}}}]"#, index);
            let result = parse(&text, &options());
            assert_eq!(result.records[0].kind, *kind);
        }
    }

    #[test]
    fn test_run_level_failures() {
        let result = parse("{not json", &options());
        assert!(!result.success);
        assert!(result
            .failure_message()
            .is_some_and(|m| m.starts_with("Failed to parse JSON")));

        let result = parse(r#"{"title": "object, not array"}"#, &options());
        assert!(!result.success);

        let result = parse("[]", &options());
        assert_eq!(result.failure_message(), Some(NO_RECORDS));

        let result = parse(r#"[{"title": ""}]"#, &options());
        assert_eq!(result.failure_message(), Some(NOTHING_IMPORTED));
        assert_eq!(result.error_count, 2);
    }
}

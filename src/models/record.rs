//! Bibliographic record model shared by every importer and the duplicate detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::utils::{extract_year, normalize_month};

/// The kind of bibliographic item a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Article,
    ConferencePaper,
    Book,
    BookChapter,
    TechReport,
    Website,
    Standard,
    Patent,
    Thesis,
    Manual,
    #[default]
    Other,
}

impl EntryKind {
    /// All kinds, in declaration order
    pub const ALL: [EntryKind; 11] = [
        EntryKind::Article,
        EntryKind::ConferencePaper,
        EntryKind::Book,
        EntryKind::BookChapter,
        EntryKind::TechReport,
        EntryKind::Website,
        EntryKind::Standard,
        EntryKind::Patent,
        EntryKind::Thesis,
        EntryKind::Manual,
        EntryKind::Other,
    ];

    /// Returns the human-readable label of the kind
    pub fn display_name(&self) -> &'static str {
        match self {
            EntryKind::Article => "Journal Article",
            EntryKind::ConferencePaper => "Conference Paper",
            EntryKind::Book => "Book",
            EntryKind::BookChapter => "Book Chapter",
            EntryKind::TechReport => "Technical Report",
            EntryKind::Website => "Website",
            EntryKind::Standard => "Standard",
            EntryKind::Patent => "Patent",
            EntryKind::Thesis => "Thesis",
            EntryKind::Manual => "Manual",
            EntryKind::Other => "Miscellaneous",
        }
    }

    /// Returns the serialized identifier of the kind
    pub fn id(&self) -> &'static str {
        match self {
            EntryKind::Article => "article",
            EntryKind::ConferencePaper => "conference-paper",
            EntryKind::Book => "book",
            EntryKind::BookChapter => "book-chapter",
            EntryKind::TechReport => "tech-report",
            EntryKind::Website => "website",
            EntryKind::Standard => "standard",
            EntryKind::Patent => "patent",
            EntryKind::Thesis => "thesis",
            EntryKind::Manual => "manual",
            EntryKind::Other => "other",
        }
    }

    /// Map a BibTeX entry type (`@article`, `@inproceedings`, ...) to a kind.
    ///
    /// Unrecognized types map to [`EntryKind::Other`].
    pub fn from_bibtex(entry_type: &str) -> Self {
        match entry_type.trim().to_ascii_lowercase().as_str() {
            "article" => EntryKind::Article,
            "inproceedings" | "conference" => EntryKind::ConferencePaper,
            "book" => EntryKind::Book,
            "inbook" | "incollection" => EntryKind::BookChapter,
            "techreport" | "report" => EntryKind::TechReport,
            "phdthesis" | "mastersthesis" | "thesis" => EntryKind::Thesis,
            "manual" => EntryKind::Manual,
            "misc" | "online" | "electronic" => EntryKind::Website,
            "standard" => EntryKind::Standard,
            "patent" => EntryKind::Patent,
            _ => EntryKind::Other,
        }
    }

    /// The BibTeX entry type written on export
    pub fn bibtex_type(&self) -> &'static str {
        match self {
            EntryKind::Article => "article",
            EntryKind::ConferencePaper => "inproceedings",
            EntryKind::Book => "book",
            EntryKind::BookChapter => "inbook",
            EntryKind::TechReport => "techreport",
            EntryKind::Thesis => "phdthesis",
            EntryKind::Manual => "manual",
            EntryKind::Standard => "standard",
            EntryKind::Patent => "patent",
            EntryKind::Website | EntryKind::Other => "misc",
        }
    }

    /// Lenient lookup used by the tabular importer.
    ///
    /// Accepts the serialized id (`conference-paper`), the CamelCase variant name
    /// (`ConferencePaper`, `InProceedings`) and BibTeX entry types, ignoring case.
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "conferencepaper" => EntryKind::ConferencePaper,
            "bookchapter" => EntryKind::BookChapter,
            "website" | "web" => EntryKind::Website,
            "misc" | "other" => EntryKind::Other,
            _ => EntryKind::from_bibtex(&key),
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Publication month, serialized as its three-letter abbreviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    /// Canonical capitalized abbreviation ("Jan" .. "Dec")
    pub fn abbrev(&self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// Months arrive from JSON in whatever form the exporter used; anything
/// unrecognized becomes `None` instead of failing the record.
fn lenient_month<'de, D>(deserializer: D) -> Result<Option<Month>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => normalize_month(&s),
        Some(serde_json::Value::Number(n)) => normalize_month(&n.to_string()),
        _ => None,
    })
}

/// Kinds arrive as ids, CamelCase names, BibTeX types or declaration-order
/// ordinals; anything else becomes [`EntryKind::Other`].
fn lenient_kind<'de, D>(deserializer: D) -> Result<EntryKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => EntryKind::from_name(&s),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| EntryKind::ALL.get(i).copied())
            .unwrap_or_default(),
        _ => EntryKind::Other,
    })
}

/// Years that are not a plain integer are read from text, else dropped
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .ok()
            .or_else(|| extract_year(&s)),
        _ => None,
    })
}

/// A bibliographic entry produced by an importer and not yet persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    /// Title as it should be stored (not comparison-normalized)
    #[serde(default)]
    pub title: String,

    /// Author display names, in source order
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, alias = "type", deserialize_with = "lenient_kind")]
    pub kind: EntryKind,

    /// Journal, proceedings or publisher the item appeared in
    #[serde(
        default,
        alias = "journalOrConference",
        alias = "journal",
        skip_serializing_if = "Option::is_none"
    )]
    pub venue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,

    #[serde(
        default,
        deserialize_with = "lenient_month",
        skip_serializing_if = "Option::is_none"
    )]
    pub month: Option<Month>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Digital Object Identifier, stored without resolver prefixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(
        default,
        rename = "abstract",
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Free-text tags, unique, in first-seen order
    #[serde(default)]
    pub tags: Vec<String>,
}

impl DraftRecord {
    /// Create a record with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Authors joined for display, "Unknown Author" when there are none
    pub fn authors_display(&self) -> String {
        if self.authors.is_empty() {
            "Unknown Author".to_string()
        } else {
            self.authors.join(", ")
        }
    }

    /// Check whether the record carries a DOI
    pub fn has_doi(&self) -> bool {
        self.doi.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    /// Add a tag unless an identical one is already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

/// A record that already lives in the target collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: Uuid,

    #[serde(flatten)]
    pub record: DraftRecord,

    #[serde(default = "Utc::now")]
    pub date_added: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub date_modified: DateTime<Utc>,
}

impl StoredRecord {
    /// Wrap a draft with a fresh identity and timestamps
    pub fn from_draft(record: DraftRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            record,
            date_added: now,
            date_modified: now,
        }
    }
}

/// Builder for constructing DraftRecord objects
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: DraftRecord,
}

impl RecordBuilder {
    /// Create a new builder with the required title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            record: DraftRecord::new(title),
        }
    }

    /// Append an author
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.record.authors.push(author.into());
        self
    }

    /// Replace the author list
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set entry kind
    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.record.kind = kind;
        self
    }

    /// Set venue
    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.record.venue = Some(venue.into());
        self
    }

    /// Set volume
    pub fn volume(mut self, volume: impl Into<String>) -> Self {
        self.record.volume = Some(volume.into());
        self
    }

    /// Set issue
    pub fn issue(mut self, issue: impl Into<String>) -> Self {
        self.record.issue = Some(issue.into());
        self
    }

    /// Set pages
    pub fn pages(mut self, pages: impl Into<String>) -> Self {
        self.record.pages = Some(pages.into());
        self
    }

    /// Set publication year
    pub fn year(mut self, year: i32) -> Self {
        self.record.year = Some(year);
        self
    }

    /// Set publication month
    pub fn month(mut self, month: Month) -> Self {
        self.record.month = Some(month);
        self
    }

    /// Set publisher
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.record.publisher = Some(publisher.into());
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.record.doi = Some(doi.into());
        self
    }

    /// Set URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.url = Some(url.into());
        self
    }

    /// Set ISBN
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.record.isbn = Some(isbn.into());
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.record.abstract_text = Some(text.into());
        self
    }

    /// Set notes
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.record.notes = Some(notes.into());
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.record.add_tag(tag);
        self
    }

    /// Build the DraftRecord
    pub fn build(self) -> DraftRecord {
        self.record
    }

    /// Build a StoredRecord with a fresh id
    pub fn stored(self) -> StoredRecord {
        StoredRecord::from_draft(self.record)
    }
}

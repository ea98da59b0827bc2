//! Utility modules supporting import and duplicate detection.
//!
//! This module provides the pure building blocks used throughout the library:
//!
//! - [`distance`] / [`similarity`]: Levenshtein edit distance and the derived [0, 1] score
//! - [`normalize_title`], [`normalize_doi`], [`normalize_author`], [`normalize_month`],
//!   [`clean_text`]: total field normalizers that never fail
//! - [`DuplicateDetector`]: tiered duplicate matching of a candidate against a corpus
//! - [`format_citation`], [`export_bibtex`], [`export_csv`], [`export_json`]: output
//!
//! # Duplicate Detection
//!
//! ```rust
//! use bib_ingest::models::{MatchReason, RecordBuilder};
//! use bib_ingest::utils::DuplicateDetector;
//!
//! let corpus = vec![RecordBuilder::new("Deep Learning").doi("10.1000/abc").stored()];
//! let candidate = RecordBuilder::new("Something Else")
//!     .doi("https://doi.org/10.1000/ABC")
//!     .build();
//!
//! let matches = DuplicateDetector::default().find_duplicates(&candidate, &corpus, None);
//! assert_eq!(matches[0].reason, MatchReason::IdentifierExact);
//! assert_eq!(matches[0].confidence, 1.0);
//! ```
//!
//! # Similarity
//!
//! ```rust
//! use bib_ingest::utils::{distance, similarity};
//!
//! assert_eq!(distance("kitten", "sitting"), 3);
//! assert_eq!(similarity("", ""), 1.0);
//! assert_eq!(similarity("", "x"), 0.0);
//! ```

mod cite;
mod dedup;
mod normalize;
mod similarity;

pub use cite::{export_bibtex, export_csv, export_json, format_citation, CitationStyle, ExportError};
pub use dedup::{
    authors_overlap, rank_matches, title_similarity, DuplicateDetector, IDENTIFIER_CONFIDENCE,
    TITLE_EXACT_CONFIDENCE,
};
pub use normalize::{
    clean_doi, clean_text, extract_year, last_name, normalize_author, normalize_doi,
    normalize_month, normalize_title, split_authors, split_list, split_unique, LATEX_ESCAPES,
};
pub use similarity::{distance, similarity};

//! Duplicate detection of an incoming record against an existing collection.
//!
//! Each (candidate, existing) pair is run through an ordered list of
//! strategies; the first one that fires decides the match for that pair:
//!
//! 1. identical DOI (confidence 1.0)
//! 2. identical comparison-normalized title (0.98)
//! 3. shared author last name, same year and title similarity above the
//!    context threshold (0.70 to 0.95)
//! 4. title similarity above the fuzzy threshold on its own (the similarity)

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::config::DuplicateConfig;
use crate::models::{DraftRecord, DuplicateMatch, MatchReason, StoredRecord};
use crate::storage::{RecordStore, StoreError};

use super::normalize::{last_name, normalize_author, normalize_doi, normalize_title};
use super::similarity::similarity;

/// Confidence reported for a DOI match
pub const IDENTIFIER_CONFIDENCE: f64 = 1.0;

/// Confidence reported for an exact normalized title match
pub const TITLE_EXACT_CONFIDENCE: f64 = 0.98;

/// Base and weight of the author/year/title confidence
const CONTEXT_BASE: f64 = 0.7;
const CONTEXT_WEIGHT: f64 = 0.25;

/// A matching strategy: `Some((confidence, reason))` when it fires
type Strategy = fn(&PairView<'_>, &DuplicateConfig) -> Option<(f64, MatchReason)>;

/// Strategies in priority order
const STRATEGIES: [Strategy; 4] = [
    identifier_exact,
    title_exact,
    author_year_title,
    title_fuzzy,
];

/// Pre-normalized view of one (candidate, existing) pair
struct PairView<'a> {
    candidate: &'a DraftRecord,
    existing: &'a DraftRecord,
    candidate_title: String,
    existing_title: String,
}

impl<'a> PairView<'a> {
    fn new(candidate: &'a DraftRecord, existing: &'a DraftRecord) -> Self {
        Self {
            candidate,
            existing,
            candidate_title: normalize_title(&candidate.title),
            existing_title: normalize_title(&existing.title),
        }
    }

    fn title_similarity(&self) -> f64 {
        normalized_title_similarity(&self.candidate_title, &self.existing_title)
    }
}

fn identifier_exact(pair: &PairView<'_>, _config: &DuplicateConfig) -> Option<(f64, MatchReason)> {
    let a = normalize_doi(pair.candidate.doi.as_deref()?);
    let b = normalize_doi(pair.existing.doi.as_deref()?);
    (!a.is_empty() && a == b).then_some((IDENTIFIER_CONFIDENCE, MatchReason::IdentifierExact))
}

fn title_exact(pair: &PairView<'_>, _config: &DuplicateConfig) -> Option<(f64, MatchReason)> {
    (!pair.candidate_title.is_empty() && pair.candidate_title == pair.existing_title)
        .then_some((TITLE_EXACT_CONFIDENCE, MatchReason::TitleExact))
}

fn author_year_title(pair: &PairView<'_>, config: &DuplicateConfig) -> Option<(f64, MatchReason)> {
    let (year_a, year_b) = (pair.candidate.year?, pair.existing.year?);
    if year_a != year_b || !authors_overlap(&pair.candidate.authors, &pair.existing.authors) {
        return None;
    }

    let sim = pair.title_similarity();
    (sim >= config.context_threshold).then_some((
        CONTEXT_BASE + sim * CONTEXT_WEIGHT,
        MatchReason::AuthorYearTitle,
    ))
}

fn title_fuzzy(pair: &PairView<'_>, config: &DuplicateConfig) -> Option<(f64, MatchReason)> {
    if pair.candidate_title.is_empty() || pair.existing_title.is_empty() {
        return None;
    }
    let sim = pair.title_similarity();
    (sim >= config.title_threshold).then_some((sim, MatchReason::TitleFuzzy))
}

/// Check whether two author lists share at least one last name (case-insensitive).
///
/// Names are normalized first, so "Smith, Alice" and "Alice Smith" agree.
pub fn authors_overlap(a: &[String], b: &[String]) -> bool {
    let last_names = |authors: &[String]| -> HashSet<String> {
        authors
            .iter()
            .map(|name| normalize_author(name))
            .filter_map(|name| last_name(&name).map(str::to_lowercase))
            .collect()
    };

    let names_a = last_names(a);
    if names_a.is_empty() {
        return false;
    }
    last_names(b).iter().any(|n| names_a.contains(n))
}

/// Similarity of two titles after comparison-normalization.
///
/// 0.0 when either title is blank, 1.0 when they normalize to the same text.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    normalized_title_similarity(&normalize_title(a), &normalize_title(b))
}

fn normalized_title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        0.0
    } else if a == b {
        1.0
    } else {
        similarity(a, b)
    }
}

/// Sort best first: confidence descending, then [`MatchReason`] order.
///
/// The sort is stable, so fully tied matches keep their corpus order.
pub fn rank_matches(matches: &mut [DuplicateMatch]) {
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.reason.cmp(&b.reason))
    });
}

/// Finds existing records that may duplicate an incoming one.
///
/// The detector holds only its thresholds; every call works on the corpus
/// snapshot it is handed.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: DuplicateConfig,
}

impl DuplicateDetector {
    /// Create a detector with the given thresholds
    pub fn new(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// The thresholds in use
    pub fn config(&self) -> &DuplicateConfig {
        &self.config
    }

    /// Evaluate the strategies for one pair, stopping at the first that fires
    pub fn check_pair(&self, candidate: &DraftRecord, existing: &StoredRecord) -> Option<DuplicateMatch> {
        let pair = PairView::new(candidate, &existing.record);
        STRATEGIES
            .iter()
            .find_map(|strategy| strategy(&pair, &self.config))
            .map(|(confidence, reason)| {
                DuplicateMatch::new(existing.id, existing.record.title.clone(), confidence, reason)
            })
    }

    /// All likely duplicates of `candidate` in `corpus`, best first.
    ///
    /// Ordering is confidence descending, then [`MatchReason`] order; equal
    /// keys keep corpus order. `exclude` skips one record by id, which is how
    /// a record being edited avoids matching itself.
    pub fn find_duplicates(
        &self,
        candidate: &DraftRecord,
        corpus: &[StoredRecord],
        exclude: Option<Uuid>,
    ) -> Vec<DuplicateMatch> {
        let mut matches: Vec<DuplicateMatch> = corpus
            .iter()
            .filter(|existing| Some(existing.id) != exclude)
            .filter_map(|existing| self.check_pair(candidate, existing))
            .collect();

        rank_matches(&mut matches);

        if let Some(limit) = self.config.max_results {
            matches.truncate(limit);
        }

        for m in &matches {
            debug!(
                candidate = %candidate.title,
                existing = %m.candidate_record_id,
                reason = %m.reason,
                confidence = m.confidence,
                "Possible duplicate"
            );
        }

        matches
    }

    /// First record in `corpus` whose DOI matches `doi`.
    ///
    /// Only the identifier strategy is used; meant for collision checks
    /// before a save rather than general duplicate scanning.
    pub fn find_by_identifier(
        &self,
        doi: &str,
        corpus: &[StoredRecord],
        exclude: Option<Uuid>,
    ) -> Option<DuplicateMatch> {
        let wanted = normalize_doi(doi);
        if wanted.is_empty() {
            return None;
        }

        corpus
            .iter()
            .filter(|existing| Some(existing.id) != exclude)
            .find(|existing| {
                existing
                    .record
                    .doi
                    .as_deref()
                    .is_some_and(|d| normalize_doi(d) == wanted)
            })
            .map(|existing| {
                DuplicateMatch::new(
                    existing.id,
                    existing.record.title.clone(),
                    IDENTIFIER_CONFIDENCE,
                    MatchReason::IdentifierExact,
                )
            })
    }

    /// [`find_duplicates`](Self::find_duplicates) against one snapshot of a store
    pub async fn find_duplicates_in(
        &self,
        store: &dyn RecordStore,
        candidate: &DraftRecord,
        exclude: Option<Uuid>,
    ) -> Result<Vec<DuplicateMatch>, StoreError> {
        let corpus = store.list_all().await?;
        Ok(self.find_duplicates(candidate, &corpus, exclude))
    }

    /// [`find_by_identifier`](Self::find_by_identifier) against one snapshot of a store
    pub async fn find_by_identifier_in(
        &self,
        store: &dyn RecordStore,
        doi: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<DuplicateMatch>, StoreError> {
        let corpus = store.list_all().await?;
        Ok(self.find_by_identifier(doi, &corpus, exclude))
    }
}

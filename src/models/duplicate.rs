//! Duplicate match model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The strategy that produced a duplicate match.
///
/// Declaration order is the tie-break order used when two matches have the
/// same confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchReason {
    /// Same DOI after normalization
    IdentifierExact,
    /// Same comparison-normalized title
    TitleExact,
    /// Shared author last name, same year and similar title
    AuthorYearTitle,
    /// Highly similar title on its own
    TitleFuzzy,
}

impl MatchReason {
    /// Short human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            MatchReason::IdentifierExact => "Same DOI",
            MatchReason::TitleExact => "Identical title",
            MatchReason::AuthorYearTitle => "Same author and year, similar title",
            MatchReason::TitleFuzzy => "Similar title",
        }
    }

    /// Returns the serialized identifier of the reason
    pub fn id(&self) -> &'static str {
        match self {
            MatchReason::IdentifierExact => "identifier-exact",
            MatchReason::TitleExact => "title-exact",
            MatchReason::AuthorYearTitle => "author-year-title",
            MatchReason::TitleFuzzy => "title-fuzzy",
        }
    }
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A candidate existing record that may duplicate an incoming one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    /// Id of the existing record
    pub candidate_record_id: Uuid,

    /// Title of the existing record, for display
    pub title: String,

    /// Strength of the hypothesis, in [0, 1]
    pub confidence: f64,

    pub reason: MatchReason,
}

impl DuplicateMatch {
    pub fn new(
        candidate_record_id: Uuid,
        title: impl Into<String>,
        confidence: f64,
        reason: MatchReason,
    ) -> Self {
        Self {
            candidate_record_id,
            title: title.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reason,
        }
    }

    /// Confidence as a whole percentage, for display
    pub fn percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_order() {
        assert!(MatchReason::IdentifierExact < MatchReason::TitleExact);
        assert!(MatchReason::TitleExact < MatchReason::AuthorYearTitle);
        assert!(MatchReason::AuthorYearTitle < MatchReason::TitleFuzzy);
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_string(&MatchReason::AuthorYearTitle).unwrap();
        assert_eq!(json, "\"author-year-title\"");
        assert_eq!(MatchReason::TitleFuzzy.to_string(), "title-fuzzy");
    }

    #[test]
    fn test_match_confidence_clamped() {
        let m = DuplicateMatch::new(Uuid::nil(), "X", 1.2, MatchReason::TitleFuzzy);
        assert_eq!(m.confidence, 1.0);
        assert_eq!(m.percent(), 100);

        let value = serde_json::to_value(&m).unwrap();
        assert!(value.get("candidateRecordId").is_some());
        assert_eq!(value["reason"], "title-fuzzy");
    }
}

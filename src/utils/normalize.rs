//! Field normalization.
//!
//! Every function here is total: malformed input degrades to a best-effort
//! value or `None`, never to an error. Whether a value is acceptable is a
//! validation concern, not a normalization one.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::Month;

/// Resolver prefixes stripped from DOIs, tried in order, first match wins
const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "doi:",
];

/// LaTeX escape sequences and their Unicode replacements, applied in order
pub const LATEX_ESCAPES: &[(&str, &str)] = &[
    ("\\'e", "é"),
    ("\\'a", "á"),
    ("\\'i", "í"),
    ("\\'o", "ó"),
    ("\\'u", "ú"),
    ("\\\"a", "ä"),
    ("\\\"o", "ö"),
    ("\\\"u", "ü"),
    ("\\~n", "ñ"),
    ("\\c{c}", "ç"),
    ("--", "\u{2013}"),
    ("``", "\u{201C}"),
    ("''", "\u{201D}"),
    ("\\&", "&"),
    ("\\%", "%"),
];

/// Month spellings accepted by [`normalize_month`]
const MONTHS: &[(&[&str], Month)] = &[
    (&["jan", "january", "1"], Month::Jan),
    (&["feb", "february", "2"], Month::Feb),
    (&["mar", "march", "3"], Month::Mar),
    (&["apr", "april", "4"], Month::Apr),
    (&["may", "5"], Month::May),
    (&["jun", "june", "6"], Month::Jun),
    (&["jul", "july", "7"], Month::Jul),
    (&["aug", "august", "8"], Month::Aug),
    (&["sep", "september", "9"], Month::Sep),
    (&["oct", "october", "10"], Month::Oct),
    (&["nov", "november", "11"], Month::Nov),
    (&["dec", "december", "12"], Month::Dec),
];

static YEAR_RE: OnceLock<Regex> = OnceLock::new();
static AUTHOR_SEP_RE: OnceLock<Regex> = OnceLock::new();

fn year_re() -> &'static Regex {
    YEAR_RE.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year pattern"))
}

fn author_separator_re() -> &'static Regex {
    AUTHOR_SEP_RE.get_or_init(|| Regex::new(r"(?i) and ").expect("valid separator pattern"))
}

/// Normalize a title for comparison only.
///
/// Lowercases, drops everything that is not a letter, digit or whitespace,
/// collapses whitespace runs and trims. Never use the result as a stored value.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip a resolver prefix from a DOI, keeping its case.
///
/// Returns `None` for blank input.
pub fn clean_doi(doi: &str) -> Option<String> {
    let trimmed = doi.trim();
    let lower = trimmed.to_ascii_lowercase();

    let stripped = DOI_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .map(|prefix| &trimmed[prefix.len()..])
        .unwrap_or(trimmed)
        .trim();

    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Comparison form of a DOI: prefix stripped and lowercased.
///
/// Blank input yields an empty string.
pub fn normalize_doi(doi: &str) -> String {
    clean_doi(doi).map(|d| d.to_lowercase()).unwrap_or_default()
}

/// Rewrite "Family, Given" as "Given Family".
///
/// Only names with exactly one comma are rewritten; anything else is
/// returned trimmed but otherwise unchanged.
pub fn normalize_author(name: &str) -> String {
    let name = name.trim();
    let parts: Vec<&str> = name.split(',').collect();
    if parts.len() != 2 {
        return name.to_string();
    }

    let family = parts[0].trim();
    let given = parts[1].trim();
    match (given.is_empty(), family.is_empty()) {
        (true, _) => family.to_string(),
        (false, true) => given.to_string(),
        (false, false) => format!("{} {}", given, family),
    }
}

/// Final whitespace-delimited token of a name
pub fn last_name(name: &str) -> Option<&str> {
    name.split_whitespace().last()
}

/// Map a month name, abbreviation or number to its canonical abbreviation
pub fn normalize_month(month: &str) -> Option<Month> {
    let key = month.trim().trim_end_matches('.').to_lowercase();
    if key.is_empty() {
        return None;
    }
    // "01" and "1" are the same month
    let key = match key.trim_start_matches('0') {
        "" => key.as_str(),
        stripped if stripped.chars().all(|c| c.is_ascii_digit()) => stripped,
        _ => key.as_str(),
    };

    MONTHS
        .iter()
        .find(|(names, _)| names.contains(&key))
        .map(|(_, month)| *month)
}

/// First four-digit year between 1900 and 2099 found in the text
pub fn extract_year(text: &str) -> Option<i32> {
    year_re()
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Clean a value taken from BibTeX markup.
///
/// Applies [`LATEX_ESCAPES`], then drops case-preserving braces, then
/// collapses whitespace.
pub fn clean_text(value: &str) -> String {
    let mut text = value.to_string();
    for (escape, replacement) in LATEX_ESCAPES {
        if text.contains(escape) {
            text = text.replace(escape, replacement);
        }
    }

    text.chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a BibTeX author field on " and " (any case) and normalize each name
pub fn split_authors(field: &str) -> Vec<String> {
    author_separator_re()
        .split(field)
        .map(normalize_author)
        .filter(|a| !a.is_empty())
        .collect()
}

/// Split a comma- or semicolon-separated list, trimming and dropping empties
pub fn split_list(field: &str) -> Vec<String> {
    field
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`split_list`] but keeps only the first occurrence of each value
pub fn split_unique(field: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in split_list(field) {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Hello, World!"), "hello world");
        assert_eq!(normalize_title("Test   Title"), "test title");
        assert_eq!(normalize_title("Test: A-B/C"), "test abc");
        assert_eq!(normalize_title("  Deep  Learning. "), "deep learning");
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title("   "), "");
        assert_eq!(normalize_title("Über Fließband"), "über fließband");
    }

    #[test]
    fn test_clean_doi() {
        assert_eq!(clean_doi("10.1000/ABC").as_deref(), Some("10.1000/ABC"));
        assert_eq!(clean_doi(" https://doi.org/10.1000/ABC ").as_deref(), Some("10.1000/ABC"));
        assert_eq!(clean_doi("HTTP://DX.DOI.ORG/10.1/x").as_deref(), Some("10.1/x"));
        assert_eq!(clean_doi("doi:10.5555/z").as_deref(), Some("10.5555/z"));
        assert_eq!(clean_doi("doi.org/10.5555/z").as_deref(), Some("10.5555/z"));
        assert_eq!(clean_doi("   "), None);
        assert_eq!(clean_doi("https://doi.org/"), None);
    }

    #[test]
    fn test_doi_prefix_first_match_only() {
        // Only one prefix is removed
        assert_eq!(normalize_doi("doi:doi:10.1/x"), "doi:10.1/x");
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("https://doi.org/10.1000/ABC"), "10.1000/abc");
        assert_eq!(normalize_doi("10.1000/abc"), "10.1000/abc");
        assert_eq!(normalize_doi(""), "");
    }

    #[test]
    fn test_normalize_author() {
        assert_eq!(normalize_author("Smith, Alice"), "Alice Smith");
        assert_eq!(normalize_author("  Smith ,  Alice B. "), "Alice B. Smith");
        assert_eq!(normalize_author("Alice Smith"), "Alice Smith");
        assert_eq!(normalize_author("Smith, Alice, Jr."), "Smith, Alice, Jr.");
        assert_eq!(normalize_author("Smith,"), "Smith");
    }

    #[test]
    fn test_last_name() {
        assert_eq!(last_name("Alice B. Smith"), Some("Smith"));
        assert_eq!(last_name("Plato"), Some("Plato"));
        assert_eq!(last_name("   "), None);
    }

    #[test]
    fn test_normalize_month() {
        assert_eq!(normalize_month("jan"), Some(Month::Jan));
        assert_eq!(normalize_month("JANUARY"), Some(Month::Jan));
        assert_eq!(normalize_month(" 9 "), Some(Month::Sep));
        assert_eq!(normalize_month("09"), Some(Month::Sep));
        assert_eq!(normalize_month("12"), Some(Month::Dec));
        assert_eq!(normalize_month("Sept."), None);
        assert_eq!(normalize_month("Aug."), Some(Month::Aug));
        assert_eq!(normalize_month("13"), None);
        assert_eq!(normalize_month("0"), None);
        assert_eq!(normalize_month(""), None);
        assert_eq!(normalize_month("spring"), None);
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2016"), Some(2016));
        assert_eq!(extract_year("circa 1998?"), Some(1998));
        assert_eq!(extract_year("in press"), None);
        assert_eq!(extract_year("1850"), None);
        assert_eq!(extract_year("20161"), None);
        assert_eq!(extract_year("2001-2003"), Some(2001));
    }

    #[test]
    fn test_clean_text_escapes() {
        assert_eq!(clean_text("Caf\\'e"), "Café");
        assert_eq!(clean_text("{\\\"U}ber"), "\\\"Uber");
        assert_eq!(clean_text("M\\\"uller"), "Müller");
        assert_eq!(clean_text("Espa\\~na"), "España");
        assert_eq!(clean_text("Fran\\c{c}ois"), "François");
        assert_eq!(clean_text("pp. 10--20"), "pp. 10\u{2013}20");
        assert_eq!(clean_text("``quoted''"), "\u{201C}quoted\u{201D}");
        assert_eq!(clean_text("R\\&D at 50\\%"), "R&D at 50%");
    }

    #[test]
    fn test_clean_text_braces_and_whitespace() {
        assert_eq!(clean_text("{The {BERT} Model}"), "The BERT Model");
        assert_eq!(clean_text("  a\n\t b  "), "a b");
        assert_eq!(clean_text("{}"), "");
    }

    #[test]
    fn test_split_authors() {
        assert_eq!(
            split_authors("Alice Smith and Bob Jones"),
            vec!["Alice Smith", "Bob Jones"]
        );
        assert_eq!(
            split_authors("Smith, Alice AND Jones, Bob"),
            vec!["Alice Smith", "Bob Jones"]
        );
        assert_eq!(split_authors("Alexander Anderson"), vec!["Alexander Anderson"]);
        assert!(split_authors("").is_empty());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b;c ;; ,"), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
        assert_eq!(split_unique("ml; ai, ml"), vec!["ml", "ai"]);
    }

    proptest! {
        #[test]
        fn prop_normalize_title_idempotent(t in "\\PC{0,40}") {
            let once = normalize_title(&t);
            prop_assert_eq!(normalize_title(&once), once);
        }

        #[test]
        fn prop_normalize_month_total(m in "\\PC{0,12}") {
            let _ = normalize_month(&m);
        }
    }
}

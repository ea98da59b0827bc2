//! BibTeX importer.
//!
//! Parsing happens in two passes. [`scan`] cuts the input into `@kind{...}`
//! envelopes by brace depth, ignoring whatever sits between them. Each
//! envelope's field block is then tokenized on its own into `name = value`
//! pairs, so a broken entry only costs that entry.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{DraftRecord, EntryKind, ImportError, ImportResult};
use crate::utils::{
    clean_doi, clean_text, extract_year, normalize_month, split_authors, split_unique,
};

use super::{ConversionError, ImportOptions};

/// Entry types that carry no bibliographic record
const SPECIAL_BLOCKS: &[&str] = &["comment", "preamble", "string"];

const NO_ENTRIES: &str = "No valid BibTeX entries found";
const NOTHING_IMPORTED: &str = "None of the BibTeX entries could be imported";

/// One `@kind{key, ...}` envelope found in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Entry type as written (`article`, `INPROCEEDINGS`, ...)
    pub kind: &'a str,

    /// Citation key
    pub key: &'a str,

    /// Everything after the key, `None` when the closing brace never came
    pub fields: Option<&'a str>,
}

/// Parse every entry in `text`
pub fn parse(text: &str, options: &ImportOptions) -> ImportResult {
    let envelopes = scan(text);
    if envelopes.is_empty() {
        return ImportResult::failed(NO_ENTRIES);
    }

    let outcomes = envelopes.iter().enumerate().map(|(index, envelope)| {
        convert(envelope, options).map_err(|e| e.at(index + 1).with_key(envelope.key))
    });

    let mut result = ImportResult::from_outcomes(envelopes.len(), outcomes);
    if !result.success {
        result.fail(NOTHING_IMPORTED);
    }
    result
}

/// Parse `text` and return its first usable record
pub fn parse_single(text: &str, options: &ImportOptions) -> Result<DraftRecord, ImportError> {
    let ImportResult {
        records, errors, ..
    } = parse(text, options);

    records.into_iter().next().ok_or_else(|| {
        errors
            .into_iter()
            .last()
            .unwrap_or_else(|| ImportError::run_level(NO_ENTRIES))
    })
}

/// Split `text` into entry envelopes.
///
/// `@comment`, `@preamble` and `@string` blocks are skipped, as is any `@`
/// that does not start `word{`. Entries without a comma after the key carry
/// no fields and are dropped. An entry whose braces never balance is kept
/// with `fields: None` and scanning resumes right after its opening brace.
pub fn scan(text: &str) -> Vec<Envelope<'_>> {
    let pairs = brace_pairs(text.as_bytes());
    let mut envelopes = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('@') {
        let at = pos + offset;
        let Some((kind, open)) = entry_header(text, at) else {
            pos = at + 1;
            continue;
        };
        let close = pairs.get(&open).copied();

        if SPECIAL_BLOCKS.iter().any(|s| kind.eq_ignore_ascii_case(s)) {
            debug!(kind, "Skipping special block");
            pos = close.map_or(open + 1, |c| c + 1);
            continue;
        }

        match close {
            Some(close) => {
                let inner = &text[open + 1..close];
                match inner.split_once(',') {
                    Some((key, fields)) => envelopes.push(Envelope {
                        kind,
                        key: key.trim(),
                        fields: Some(fields),
                    }),
                    None => debug!(kind, key = inner.trim(), "Skipping entry without fields"),
                }
                pos = close + 1;
            }
            None => {
                let rest = &text[open + 1..];
                let key = rest
                    .split([',', '\n'])
                    .next()
                    .unwrap_or_default()
                    .trim();
                debug!(kind, key, "Entry is not terminated");
                envelopes.push(Envelope {
                    kind,
                    key,
                    fields: None,
                });
                pos = open + 1;
            }
        }
    }

    envelopes
}

/// Entry type and position of the opening brace, if `@` at `at` starts an entry
fn entry_header(text: &str, at: usize) -> Option<(&str, usize)> {
    let after = &text[at + 1..];
    let kind_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(after.len());
    if kind_len == 0 {
        return None;
    }

    let rest = &after[kind_len..];
    let trimmed = rest.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    Some((&after[..kind_len], at + 1 + kind_len + (rest.len() - trimmed.len())))
}

/// Closing brace of every opening brace that has one, in a single pass.
///
/// Stray closing braces are ignored.
fn brace_pairs(bytes: &[u8]) -> HashMap<usize, usize> {
    let mut open = Vec::new();
    let mut pairs = HashMap::new();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, i);
                }
            }
            _ => {}
        }
    }
    pairs
}

/// Index of the brace closing the one at `open`
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the quote closing the one at 0; quotes inside braces or after a
/// backslash do not count
fn closing_quote(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut prev = 0u8;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'"' if depth == 0 && prev != b'\\' => return Some(i),
            _ => {}
        }
        prev = b;
    }
    None
}

/// Tokenizer over an entry's field block, yielding `(lowercase name, raw value)`.
///
/// Stops after the first error.
struct Fields<'a> {
    text: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            failed: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        let rest = self.rest();
        self.pos += rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
    }

    fn value(&mut self, field: &str) -> Result<&'a str, ConversionError> {
        self.skip_while(char::is_whitespace);
        let rest = self.rest();

        match rest.as_bytes().first() {
            Some(b'{') => {
                let close = matching_brace(rest.as_bytes(), 0).ok_or_else(|| {
                    ConversionError::UnterminatedValue {
                        field: field.to_string(),
                    }
                })?;
                self.pos += close + 1;
                Ok(&rest[1..close])
            }
            Some(b'"') => {
                let close = closing_quote(rest.as_bytes()).ok_or_else(|| {
                    ConversionError::UnterminatedValue {
                        field: field.to_string(),
                    }
                })?;
                self.pos += close + 1;
                Ok(&rest[1..close])
            }
            // Bare numbers and macro names (`year = 2020`, `month = jan`)
            Some(b) if b.is_ascii_alphanumeric() => {
                let len = rest
                    .find(|c: char| c == ',' || c == '#' || c.is_whitespace())
                    .unwrap_or(rest.len());
                self.pos += len;
                Ok(&rest[..len])
            }
            _ => Err(ConversionError::MissingValue {
                field: field.to_string(),
            }),
        }
    }

    /// A value plus any `# ...` concatenation; only the first part is kept
    fn full_value(&mut self, field: &str) -> Result<&'a str, ConversionError> {
        let value = self.value(field)?;
        self.skip_while(char::is_whitespace);
        while self.rest().starts_with('#') {
            self.pos += 1;
            self.value(field)?;
            self.skip_while(char::is_whitespace);
        }

        let rest = self.rest();
        if !rest.is_empty() && !rest.starts_with(',') {
            debug!(field, "Missing comma after field value");
        }
        Ok(value)
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<(String, &'a str), ConversionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            self.skip_while(|c| c == ',' || c.is_whitespace());
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }

            let name_end = rest.find(['=', ',']).unwrap_or(rest.len());
            let name = rest[..name_end].trim().to_ascii_lowercase();
            if !rest[name_end..].starts_with('=') {
                debug!(name = %name, "Skipping field without '='");
                self.pos += name_end;
                continue;
            }
            self.pos += name_end + 1;

            match self.full_value(&name) {
                Ok(value) => {
                    if name.is_empty() {
                        continue;
                    }
                    return Some(Ok((name, value)));
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Turn one envelope into a record
fn convert(envelope: &Envelope<'_>, options: &ImportOptions) -> Result<DraftRecord, ConversionError> {
    let block = envelope.fields.ok_or(ConversionError::UnterminatedEntry)?;
    // Later duplicates overwrite earlier ones
    let fields: HashMap<String, &str> = Fields::new(block).collect::<Result<_, _>>()?;

    let raw = |name: &str| fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());
    let text = |name: &str| raw(name).map(clean_text).filter(|v| !v.is_empty());

    let title = match fields.get("title") {
        Some(value) => {
            let title = clean_text(value);
            if title.is_empty() {
                return Err(ConversionError::MissingTitle);
            }
            title
        }
        None => format!("Untitled ({})", envelope.key),
    };

    let mut record = DraftRecord {
        title,
        authors: raw("author")
            .map(|a| split_authors(&clean_text(a)))
            .unwrap_or_default(),
        kind: EntryKind::from_bibtex(envelope.kind),
        venue: text("journal")
            .or_else(|| text("booktitle"))
            .or_else(|| text("publisher")),
        volume: text("volume"),
        issue: text("number"),
        pages: text("pages"),
        year: raw("year").and_then(extract_year),
        month: text("month").and_then(|m| normalize_month(&m)),
        publisher: text("publisher"),
        doi: raw("doi").and_then(|d| clean_doi(&strip_braces(d))),
        url: raw("url")
            .or_else(|| raw("howpublished"))
            .map(strip_url_macro)
            .filter(|u| !u.is_empty()),
        isbn: text("isbn"),
        abstract_text: text("abstract"),
        notes: text("note"),
        tags: text("keywords")
            .map(|k| split_unique(&k))
            .unwrap_or_default(),
    };

    options.fill_authors(&mut record);
    Ok(record)
}

fn strip_braces(value: &str) -> String {
    value.chars().filter(|c| *c != '{' && *c != '}').collect()
}

/// `\url{https://...}` to `https://...`
fn strip_url_macro(value: &str) -> String {
    let value = value.trim();
    let inner = value.strip_prefix("\\url").unwrap_or(value);
    strip_braces(inner).trim().to_string()
}

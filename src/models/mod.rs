//! Core data models for bibliographic records, import results and duplicate matches.

mod duplicate;
mod import;
mod record;

pub use duplicate::{DuplicateMatch, MatchReason};
pub use import::{ImportError, ImportFormat, ImportResult};
pub use record::{DraftRecord, EntryKind, Month, RecordBuilder, StoredRecord};

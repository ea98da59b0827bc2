//! # bib-ingest
//!
//! Import bibliographic records from BibTeX, CSV and JSON, normalize them,
//! and find likely duplicates in an existing collection.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (DraftRecord, ImportResult, DuplicateMatch, etc.)
//! - [`import`]: Format importers producing draft records and per-item errors
//! - [`utils`]: Similarity, normalization, duplicate detection and export
//! - [`storage`]: The record store collaborator consulted by the detector
//! - [`config`]: Configuration management

pub mod config;
pub mod import;
pub mod models;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use import::{import, import_auto, ImportOptions};
pub use models::{DraftRecord, DuplicateMatch, ImportResult, StoredRecord};
pub use storage::{MemoryStore, RecordStore};
pub use utils::DuplicateDetector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Storage collaborator interface.
//!
//! The import pipeline never persists anything itself. Duplicate detection
//! only needs a read-only snapshot of the collection, obtained through
//! [`RecordStore::list_all`]; the remaining operations exist so callers can
//! act on the detector's verdict with the same handle.
//!
//! # Implementing a Store
//!
//! 1. Create a struct that implements `RecordStore`
//! 2. `list_all` must return a snapshot; callers never observe later writes
//!    through a list they already hold
//! 3. Map backend failures onto [`StoreError`]

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::StoredRecord;

/// Key-value access to the target collection
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Every record in the collection, as an owned snapshot
    async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError>;

    /// A single record by id
    async fn get(&self, id: Uuid) -> Result<Option<StoredRecord>, StoreError>;

    /// Insert or replace a record
    async fn put(&self, record: StoredRecord) -> Result<(), StoreError>;

    /// Remove a record, returning it if it existed
    async fn delete(&self, id: Uuid) -> Result<Option<StoredRecord>, StoreError>;
}

/// Errors that can occur when talking to a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    /// Stored data could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Parse(format!("JSON: {}", err))
    }
}

//! In-process record store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use uuid::Uuid;

use crate::models::StoredRecord;

use super::{RecordStore, StoreError};

/// A store that keeps records in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<Uuid, StoredRecord>,
    order: Vec<Uuid>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given records
    pub fn from_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        let mut inner = Inner::default();
        for record in records {
            inner.insert(record);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Seed a store from a JSON array of stored records
    pub async fn load_json(path: &Path) -> Result<Self, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        let records: Vec<StoredRecord> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), count = records.len(), "Loaded corpus");
        Ok(Self::from_records(records))
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.order.len()).unwrap_or(0)
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn insert(&mut self, record: StoredRecord) {
        if self.records.insert(record.id, record.clone()).is_none() {
            self.order.push(record.id);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.records.get(&id).cloned())
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.insert(record);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let removed = inner.records.remove(&id);
        if removed.is_some() {
            inner.order.retain(|existing| *existing != id);
        }
        Ok(removed)
    }
}

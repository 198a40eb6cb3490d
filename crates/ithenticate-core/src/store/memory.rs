//! In-memory [`DocumentStore`] implementation for tests.
//!
//! Keeps records in a `HashMap` keyed by [`EntityKey`] behind
//! `std::sync::RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{DocumentRecord, EntityKey, RecordCriteria};

use super::DocumentStore;

/// In-memory store for tests.
pub struct InMemoryStore {
    records: RwLock<HashMap<EntityKey, DocumentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, criteria: &RecordCriteria) -> Result<Option<DocumentRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("record map lock poisoned"))?;
        Ok(records
            .values()
            .filter(|r| criteria.matches(r))
            .max_by_key(|r| r.revision_id().unwrap_or(0))
            .cloned())
    }

    async fn upsert(&self, record: &DocumentRecord) -> Result<()> {
        let key = record.validate()?;
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("record map lock poisoned"))?;
        records.insert(key, record.clone());
        Ok(())
    }

    async fn delete(&self, key: &EntityKey) -> Result<u64> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("record map lock poisoned"))?;
        Ok(records.remove(key).map_or(0, |_| 1))
    }
}

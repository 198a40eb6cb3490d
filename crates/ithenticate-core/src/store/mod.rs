//! Storage abstraction for document records.
//!
//! The [`DocumentStore`] trait is the repository the request wrapper
//! persists through. Backends: [`memory::InMemoryStore`] here, and the
//! SQLite store in the `ithenticate-bridge` crate.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! No implementation caches records; every lookup reads the backend.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentRecord, EntityKey, RecordCriteria};

/// Abstract storage backend for document records.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find`](DocumentStore::find) | Load at most one record matching the criteria |
/// | [`upsert`](DocumentStore::upsert) | Insert or update a record, keyed by its [`EntityKey`] |
/// | [`delete`](DocumentStore::delete) | Remove the record stored under a key |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a single record.
    ///
    /// When several rows match (an entity lookup without a revision), the
    /// one with the highest revision is returned.
    async fn find(&self, criteria: &RecordCriteria) -> Result<Option<DocumentRecord>>;

    /// Insert or update a record.
    ///
    /// Callers validate first; see [`DocumentRecord::save`].
    async fn upsert(&self, record: &DocumentRecord) -> Result<()>;

    /// Delete the record stored under `key`. Returns the number of rows removed.
    async fn delete(&self, key: &EntityKey) -> Result<u64>;
}

impl DocumentRecord {
    /// Load a record by its iThenticate document ID.
    pub async fn load_by_document_id(
        store: &dyn DocumentStore,
        document_id: i64,
    ) -> Result<Option<Self>> {
        store.find(&RecordCriteria::DocumentId(document_id)).await
    }

    /// Load a record by its iThenticate report ID.
    pub async fn load_by_report_id(
        store: &dyn DocumentStore,
        report_id: i64,
    ) -> Result<Option<Self>> {
        store.find(&RecordCriteria::ReportId(report_id)).await
    }

    /// Load a record by entity data. Without a revision, any revision matches.
    pub async fn load_by_entity_data(
        store: &dyn DocumentStore,
        entity_type: &str,
        bundle: &str,
        entity_id: i64,
        revision_id: Option<i64>,
    ) -> Result<Option<Self>> {
        store
            .find(&RecordCriteria::entity(
                entity_type,
                bundle,
                entity_id,
                revision_id,
            ))
            .await
    }

    /// Validate and upsert. Nothing is written when validation fails.
    pub async fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        self.validate()?;
        store.upsert(self).await
    }

    /// Delete the row stored under this record's full key.
    pub async fn delete(&self, store: &dyn DocumentStore) -> Result<u64> {
        let key = self.key()?;
        store.delete(&key).await
    }
}

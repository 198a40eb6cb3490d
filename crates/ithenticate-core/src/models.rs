//! Document records and their identifying keys.
//!
//! A [`DocumentRecord`] maps a local content entity, identified by
//! `(entity type, bundle, entity ID, optional revision)`, to the identifiers
//! iThenticate assigns once the entity's file has been submitted.

use serde::Serialize;
use thiserror::Error;

/// Entity type used for content submitted through the bridge.
pub const NODE_ENTITY_TYPE: &str = "node";

/// Reasons a record cannot be written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("cannot save an iThenticate document without a document ID")]
    MissingDocumentId,
    #[error("cannot save an iThenticate document without an entity type, bundle and entity ID")]
    IncompleteKey,
    #[error("percent match must be within 0..=100, got {0}")]
    PercentMatchOutOfRange(i64),
}

/// The complete local key of a stored record.
///
/// A revision of `None` is stored as revision `0`; a stored `0` reads back
/// as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityKey {
    pub entity_type: String,
    pub bundle: String,
    pub entity_id: i64,
    pub revision_id: Option<i64>,
}

impl EntityKey {
    /// Revision value as written to the storage column.
    pub fn storage_revision(&self) -> i64 {
        self.revision_id.unwrap_or(0)
    }
}

/// Local entity ↔ iThenticate document mapping.
///
/// Every attribute may be absent until first set. Setters take plain values,
/// so an attribute that has been set cannot be cleared again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    entity_type: Option<String>,
    bundle: Option<String>,
    entity_id: Option<i64>,
    revision_id: Option<i64>,
    document_id: Option<i64>,
    report_id: Option<i64>,
    report_url: Option<String>,
    percent_match: Option<i64>,
}

impl DocumentRecord {
    /// A fresh, unsubmitted record for the given entity.
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        entity_id: i64,
        revision_id: Option<i64>,
    ) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            bundle: Some(bundle.into()),
            entity_id: Some(entity_id),
            revision_id: revision_id.filter(|r| *r > 0),
            ..Self::default()
        }
    }

    /// Rebuild a record from stored column values.
    pub fn from_parts(
        key: EntityKey,
        document_id: Option<i64>,
        report_id: Option<i64>,
        report_url: Option<String>,
        percent_match: Option<i64>,
    ) -> Self {
        Self {
            entity_type: Some(key.entity_type),
            bundle: Some(key.bundle),
            entity_id: Some(key.entity_id),
            revision_id: key.revision_id.filter(|r| *r > 0),
            document_id,
            report_id,
            report_url,
            percent_match,
        }
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn set_entity_type(&mut self, entity_type: impl Into<String>) {
        self.entity_type = Some(entity_type.into());
    }

    pub fn bundle(&self) -> Option<&str> {
        self.bundle.as_deref()
    }

    pub fn set_bundle(&mut self, bundle: impl Into<String>) {
        self.bundle = Some(bundle.into());
    }

    pub fn entity_id(&self) -> Option<i64> {
        self.entity_id
    }

    pub fn set_entity_id(&mut self, entity_id: i64) {
        self.entity_id = Some(entity_id);
    }

    pub fn revision_id(&self) -> Option<i64> {
        self.revision_id
    }

    pub fn set_revision_id(&mut self, revision_id: i64) {
        self.revision_id = Some(revision_id);
    }

    /// iThenticate document ID, assigned after submission.
    pub fn document_id(&self) -> Option<i64> {
        self.document_id
    }

    pub fn set_document_id(&mut self, document_id: i64) {
        self.document_id = Some(document_id);
    }

    /// iThenticate report ID, assigned once the report has been generated.
    pub fn report_id(&self) -> Option<i64> {
        self.report_id
    }

    pub fn set_report_id(&mut self, report_id: i64) {
        self.report_id = Some(report_id);
    }

    /// Read-only report URL.
    pub fn report_url(&self) -> Option<&str> {
        self.report_url.as_deref()
    }

    pub fn set_report_url(&mut self, report_url: impl Into<String>) {
        self.report_url = Some(report_url.into());
    }

    /// Similarity score of the finished report.
    pub fn percent_match(&self) -> Option<i64> {
        self.percent_match
    }

    pub fn set_percent_match(&mut self, percent_match: i64) {
        self.percent_match = Some(percent_match);
    }

    /// The identifying key, if every required component is present.
    ///
    /// Empty strings count as absent.
    pub fn key(&self) -> Result<EntityKey, RecordError> {
        let entity_type = self
            .entity_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::IncompleteKey)?;
        let bundle = self
            .bundle
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::IncompleteKey)?;
        let entity_id = self.entity_id.ok_or(RecordError::IncompleteKey)?;

        Ok(EntityKey {
            entity_type: entity_type.to_string(),
            bundle: bundle.to_string(),
            entity_id,
            revision_id: self.revision_id.filter(|r| *r > 0),
        })
    }

    /// Checks the invariants a record must satisfy before it is written.
    pub fn validate(&self) -> Result<EntityKey, RecordError> {
        if self.document_id.is_none() {
            return Err(RecordError::MissingDocumentId);
        }
        let key = self.key()?;
        if let Some(pm) = self.percent_match {
            if !(0..=100).contains(&pm) {
                return Err(RecordError::PercentMatchOutOfRange(pm));
            }
        }
        Ok(key)
    }
}

/// Lookup criteria accepted by [`DocumentStore::find`](crate::store::DocumentStore::find).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordCriteria {
    DocumentId(i64),
    ReportId(i64),
    /// A revision of `None` matches any stored revision.
    Entity {
        entity_type: String,
        bundle: String,
        entity_id: i64,
        revision_id: Option<i64>,
    },
}

impl RecordCriteria {
    pub fn entity(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        entity_id: i64,
        revision_id: Option<i64>,
    ) -> Self {
        RecordCriteria::Entity {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            entity_id,
            revision_id: revision_id.filter(|r| *r > 0),
        }
    }

    pub fn matches(&self, record: &DocumentRecord) -> bool {
        match self {
            RecordCriteria::DocumentId(id) => record.document_id == Some(*id),
            RecordCriteria::ReportId(id) => record.report_id == Some(*id),
            RecordCriteria::Entity {
                entity_type,
                bundle,
                entity_id,
                revision_id,
            } => {
                record.entity_type.as_deref() == Some(entity_type.as_str())
                    && record.bundle.as_deref() == Some(bundle.as_str())
                    && record.entity_id == Some(*entity_id)
                    && revision_id.map_or(true, |r| record.revision_id == Some(r))
            }
        }
    }
}

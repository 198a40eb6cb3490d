//! The request wrapper: submission and report polling.
//!
//! [`RequestWrapper`] combines an authenticated [`VendorClient`], a
//! [`DocumentStore`], a [`FileSource`] and a [`Notifier`]. Every operation is
//! a short sequence of awaited round trips; nothing is retried here. Callers
//! poll again on their own schedule.
//!
//! # Failure tiers
//!
//! - **Hard** ([`WrapperError`]): no file attached, file missing,
//!   undecodable pending-check response, invalid record, storage errors,
//!   vendor errors during submission.
//! - **Soft** ([`Notice`]): report ID or URL not available yet, report
//!   still pending, field errors reported by the vendor, a percent match
//!   outside 0..=100. The affected value is left unset.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::entity::{resolve_submitter, ContentEntity, FileSource, SubmissionContext};
use crate::models::{DocumentRecord, RecordError};
use crate::notice::{Notice, Notifier};
use crate::store::DocumentStore;
use crate::vendor::{VendorClient, VendorError};

#[derive(Debug, Error)]
pub enum WrapperError {
    #[error("cannot submit entity {entity_id} without a file")]
    MissingFile { entity_id: i64 },
    #[error("failed to load file {fid} for entity {entity_id}")]
    FileNotFound { entity_id: i64, fid: i64 },
    #[error("could not decode the report state of document {document_id}: {reason}")]
    Decode { document_id: i64, reason: String },
    #[error(transparent)]
    Vendor(#[from] VendorError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct RequestWrapper {
    client: Arc<dyn VendorClient>,
    store: Arc<dyn DocumentStore>,
    files: Arc<dyn FileSource>,
    notifier: Arc<dyn Notifier>,
    folder_number: i64,
}

impl RequestWrapper {
    /// `folder_number` is the iThenticate folder new uploads go to.
    pub fn new(
        client: Arc<dyn VendorClient>,
        store: Arc<dyn DocumentStore>,
        files: Arc<dyn FileSource>,
        notifier: Arc<dyn Notifier>,
        folder_number: i64,
    ) -> Self {
        Self {
            client,
            store,
            files,
            notifier,
            folder_number,
        }
    }

    /// Session ID of the underlying vendor session.
    pub fn get_sid(&self) -> &str {
        self.client.sid()
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Submit an entity's paper file.
    ///
    /// Entities that already have a document ID are returned as stored, with
    /// a status notice; the vendor is not called.
    pub async fn submit_document(
        &self,
        entity: &ContentEntity,
    ) -> Result<DocumentRecord, WrapperError> {
        let existing = DocumentRecord::load_by_entity_data(
            self.store.as_ref(),
            &entity.entity_type,
            &entity.bundle,
            entity.entity_id,
            entity.revision_id,
        )
        .await?;

        let mut record = match existing {
            Some(record) if record.document_id().is_some() => {
                self.notifier.notify(Notice::status(format!(
                    "Entity {} {} already has a document submitted to iThenticate.",
                    entity.entity_type, entity.entity_id
                )));
                return Ok(record);
            }
            Some(record) => record,
            None => DocumentRecord::new(
                entity.entity_type.clone(),
                entity.bundle.clone(),
                entity.entity_id,
                entity.revision_id,
            ),
        };

        let file_ref = entity.file.as_ref().ok_or(WrapperError::MissingFile {
            entity_id: entity.entity_id,
        })?;
        let file = self
            .files
            .load(file_ref)
            .await?
            .ok_or(WrapperError::FileNotFound {
                entity_id: entity.entity_id,
                fid: file_ref.fid,
            })?;

        let submitter = resolve_submitter(entity);
        debug!(
            entity_id = entity.entity_id,
            filename = %file.filename,
            bytes = file.contents.len(),
            "submitting as {}",
            submitter
        );

        let submission = SubmissionContext {
            title: entity.title.clone(),
            file_bytes: file.contents,
            filename: file.filename,
            first_name: submitter.first_name.unwrap_or_default(),
            last_name: submitter.last_name.unwrap_or_default(),
            folder: self.folder_number,
        };

        let document_id = self.client.submit_document(&submission).await?;
        info!(
            entity_id = entity.entity_id,
            document_id, "document submitted"
        );

        record.set_document_id(document_id);
        self.persist(&record).await?;
        Ok(record)
    }

    /// Whether the report for `document_id` is still being generated.
    ///
    /// Only an explicit `is_pending = 0` counts as finished.
    pub async fn check_is_document_report_pending(
        &self,
        document_id: i64,
    ) -> Result<bool, WrapperError> {
        match self.client.fetch_document_state(document_id).await {
            Ok(state) => Ok(state.is_pending()),
            Err(VendorError::Decode(reason)) => Err(WrapperError::Decode {
                document_id,
                reason,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch and store the report ID. On failure a warning is emitted and
    /// the record comes back unchanged.
    pub async fn fetch_document_report_id(
        &self,
        mut record: DocumentRecord,
    ) -> Result<DocumentRecord, WrapperError> {
        let Some(document_id) = record.document_id() else {
            self.notifier.notify(Notice::warning(
                "Cannot retrieve a report ID for a document that was never submitted.",
            ));
            return Ok(record);
        };

        match self.client.fetch_report_id(document_id).await {
            Ok(report_id) => {
                record.set_report_id(report_id);
                self.persist(&record).await?;
            }
            Err(e) => {
                debug!(document_id, "report ID unavailable: {}", e);
                self.notifier.notify(Notice::warning(
                    "Failed to retrieve the report ID. Is the report still pending?",
                ));
            }
        }
        Ok(record)
    }

    /// Fetch and store the read-only report URL, keyed by the report ID.
    pub async fn fetch_document_report_url(
        &self,
        mut record: DocumentRecord,
    ) -> Result<DocumentRecord, WrapperError> {
        let Some(report_id) = record.report_id() else {
            self.notifier.notify(Notice::warning(
                "Cannot retrieve a report URL before the report ID is known.",
            ));
            return Ok(record);
        };

        match self.client.fetch_report_url(report_id).await {
            Ok(url) => {
                record.set_report_url(url);
                self.persist(&record).await?;
            }
            Err(e) => {
                debug!(report_id, "report URL unavailable: {}", e);
                self.notifier.notify(Notice::warning(
                    "Failed to retrieve the report URL. Is the report still pending?",
                ));
            }
        }
        Ok(record)
    }

    /// Refresh everything known about a submitted document's report.
    ///
    /// Reads the document state; stops with notices on vendor field errors
    /// or while pending. Otherwise stores the percent match (a value outside
    /// 0..=100 is skipped with a warning), takes the report ID from the same
    /// state when it is not known yet (asking the vendor again only if the
    /// state lacks one), then fetches the report URL.
    pub async fn get_report_data(
        &self,
        mut record: DocumentRecord,
    ) -> Result<DocumentRecord, WrapperError> {
        let Some(document_id) = record.document_id() else {
            return Ok(record);
        };

        let state = match self.client.fetch_document_state(document_id).await {
            Ok(state) => state,
            Err(e) => {
                self.notifier.notify(Notice::error(format!(
                    "Failed to retrieve the state of document {}: {}",
                    document_id, e
                )));
                return Ok(record);
            }
        };

        if !state.field_errors.is_empty() {
            for (field, messages) in &state.field_errors {
                for message in messages {
                    self.notifier
                        .notify(Notice::error(format!("{}: {}", field, message)));
                }
            }
            return Ok(record);
        }

        if state.is_pending() {
            self.notifier.notify(Notice::warning(format!(
                "The report for document {} is not ready yet.",
                document_id
            )));
            return Ok(record);
        }

        match state.percent_match {
            Some(percent_match) if (0..=100).contains(&percent_match) => {
                record.set_percent_match(percent_match);
                self.persist(&record).await?;
            }
            Some(percent_match) => {
                self.notifier.notify(Notice::warning(format!(
                    "Ignoring out-of-range percent match {} for document {}.",
                    percent_match, document_id
                )));
            }
            None => {}
        }

        if record.report_id().is_none() {
            match state.report_id {
                Some(report_id) => {
                    record.set_report_id(report_id);
                    self.persist(&record).await?;
                }
                None => record = self.fetch_document_report_id(record).await?,
            }
        }
        self.fetch_document_report_url(record).await
    }

    async fn persist(&self, record: &DocumentRecord) -> Result<(), WrapperError> {
        record.validate()?;
        self.store.upsert(record).await?;
        Ok(())
    }
}

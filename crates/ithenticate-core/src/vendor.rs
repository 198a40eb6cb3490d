//! Vendor API abstraction.
//!
//! [`VendorClient`] is the seam between the request wrapper and the
//! iThenticate API. Every call returns a value or a [`VendorError`]; there
//! are no sentinel returns.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::SubmissionContext;

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("request to iThenticate failed: {0}")]
    Transport(String),
    #[error("iThenticate API error {status}: {message}")]
    Api { status: i64, message: String },
    #[error("could not decode iThenticate response: {0}")]
    Decode(String),
    /// The requested value does not exist yet (usually: report still pending).
    #[error("{0} is not available")]
    Unavailable(String),
}

/// Current state of a submitted document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    /// Raw `is_pending` flag as returned by the API.
    pub is_pending: Option<i64>,
    pub percent_match: Option<i64>,
    /// ID of the first report part, if the API already lists one.
    pub report_id: Option<i64>,
    /// Field-level errors reported by the API, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl DocumentState {
    pub fn is_pending(&self) -> bool {
        pending_flag(self.is_pending)
    }
}

/// Interprets the raw `is_pending` flag: only an explicit `0` means the
/// report is finished.
pub fn pending_flag(raw: Option<i64>) -> bool {
    raw != Some(0)
}

/// Client for an authenticated iThenticate session.
#[async_trait]
pub trait VendorClient: Send + Sync {
    /// Session ID obtained at login.
    fn sid(&self) -> &str;

    /// Upload a document; returns the new document ID.
    async fn submit_document(&self, submission: &SubmissionContext) -> Result<i64, VendorError>;

    async fn fetch_document_state(&self, document_id: i64) -> Result<DocumentState, VendorError>;

    /// Report ID for a document. [`VendorError::Unavailable`] while pending.
    async fn fetch_report_id(&self, document_id: i64) -> Result<i64, VendorError>;

    /// Read-only report URL for a report.
    async fn fetch_report_url(&self, report_id: i64) -> Result<String, VendorError>;
}

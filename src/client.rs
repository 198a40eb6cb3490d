//! iThenticate XML-RPC client.
//!
//! [`XmlRpcClient::login`] opens a session; the returned client implements
//! [`VendorClient`] for the request wrapper.
//!
//! | Operation | XML-RPC method | Payload read |
//! |-----------|----------------|--------------|
//! | login | `login` | `sid` |
//! | submit | `document.add` | `uploaded[0].id` |
//! | state / report ID | `document.get` | `documents[0].{is_pending, percent_match, parts[0].id}` |
//! | report URL | `report.get` | `report_url` |
//!
//! Responses carry an HTTP-like `status` member; anything other than 200 is
//! an [`VendorError::Api`]. No call is retried.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use ithenticate_core::entity::SubmissionContext;
use ithenticate_core::vendor::{DocumentState, VendorClient, VendorError};

use crate::config::Credentials;
use crate::xmlrpc::{self, structure, Value, XmlRpcError};

/// `submit_to` value for "generate a similarity report".
const SUBMIT_TO_REPORT: i64 = 1;

pub struct XmlRpcClient {
    http: reqwest::Client,
    endpoint: String,
    sid: String,
}

impl XmlRpcClient {
    /// Authenticate and return a client bound to the new session.
    pub async fn login(credentials: &Credentials, timeout_secs: u64) -> Result<Self, VendorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| VendorError::Transport(e.to_string()))?;

        let params = structure([
            ("username", Value::from(credentials.username.as_str())),
            ("password", Value::from(credentials.password.as_str())),
        ]);
        let response = call(&http, &credentials.api_url, "login", params).await?;
        ensure_ok(&response)?;
        let sid = parse_sid(&response)?;
        debug!(endpoint = %credentials.api_url, "iThenticate session opened");

        Ok(Self {
            http,
            endpoint: credentials.api_url.clone(),
            sid,
        })
    }

    async fn session_call(
        &self,
        method: &str,
        members: Vec<(&str, Value)>,
    ) -> Result<Value, VendorError> {
        let mut params = BTreeMap::new();
        params.insert("sid".to_string(), Value::from(self.sid.as_str()));
        for (k, v) in members {
            params.insert(k.to_string(), v);
        }
        call(&self.http, &self.endpoint, method, Value::Struct(params)).await
    }
}

#[async_trait]
impl VendorClient for XmlRpcClient {
    fn sid(&self) -> &str {
        &self.sid
    }

    async fn submit_document(&self, submission: &SubmissionContext) -> Result<i64, VendorError> {
        let upload = structure([
            ("title", Value::from(submission.title.as_str())),
            ("author_first", Value::from(submission.first_name.as_str())),
            ("author_last", Value::from(submission.last_name.as_str())),
            ("filename", Value::from(submission.filename.as_str())),
            ("upload", Value::Base64(submission.file_bytes.clone())),
        ]);
        let response = self
            .session_call(
                "document.add",
                vec![
                    ("folder", Value::Int(submission.folder)),
                    ("submit_to", Value::Int(SUBMIT_TO_REPORT)),
                    ("uploads", Value::Array(vec![upload])),
                ],
            )
            .await?;
        ensure_ok(&response)?;
        parse_uploaded_id(&response)
    }

    async fn fetch_document_state(&self, document_id: i64) -> Result<DocumentState, VendorError> {
        let response = self
            .session_call("document.get", vec![("id", Value::Int(document_id))])
            .await?;
        parse_document_state(&response)
    }

    async fn fetch_report_id(&self, document_id: i64) -> Result<i64, VendorError> {
        let response = self
            .session_call("document.get", vec![("id", Value::Int(document_id))])
            .await?;
        ensure_ok(&response)?;
        parse_report_id(&response)
    }

    async fn fetch_report_url(&self, report_id: i64) -> Result<String, VendorError> {
        let response = self
            .session_call("report.get", vec![("id", Value::Int(report_id))])
            .await?;
        ensure_ok(&response)?;
        parse_report_url(&response)
    }
}

async fn call(
    http: &reqwest::Client,
    endpoint: &str,
    method: &str,
    params: Value,
) -> Result<Value, VendorError> {
    let body = xmlrpc::encode_call(method, &[params]);
    debug!(method, "iThenticate call");

    let response = http
        .post(endpoint)
        .header("Content-Type", "text/xml")
        .body(body)
        .send()
        .await
        .map_err(|e| VendorError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| VendorError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(VendorError::Api {
            status: i64::from(status.as_u16()),
            message: text.chars().take(200).collect(),
        });
    }

    xmlrpc::decode_response(&text).map_err(|e| match e {
        XmlRpcError::Fault { code, message } => VendorError::Api {
            status: code,
            message,
        },
        other => VendorError::Decode(other.to_string()),
    })
}

/// Fails unless the response's `status` member is 200 (or absent).
fn ensure_ok(response: &Value) -> Result<(), VendorError> {
    match response.get("status").and_then(Value::as_i64) {
        None | Some(200) => Ok(()),
        Some(status) => Err(VendorError::Api {
            status,
            message: first_message(response).unwrap_or_else(|| "request rejected".to_string()),
        }),
    }
}

/// First entry of the `messages` array, if any.
fn first_message(response: &Value) -> Option<String> {
    response
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|m| m.first())
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_sid(response: &Value) -> Result<String, VendorError> {
    response
        .get("sid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| VendorError::Decode("login response carries no sid".to_string()))
}

fn parse_uploaded_id(response: &Value) -> Result<i64, VendorError> {
    response
        .get("uploaded")
        .and_then(Value::as_array)
        .and_then(|u| u.first())
        .and_then(|u| u.get("id"))
        .and_then(Value::as_i64)
        .ok_or_else(|| VendorError::Unavailable("uploaded document ID".to_string()))
}

fn first_document(response: &Value) -> Option<&Value> {
    response
        .get("documents")
        .and_then(Value::as_array)
        .and_then(|d| d.first())
}

/// Field errors come back in an `errors` struct of `field => [message]`.
fn parse_field_errors(response: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(errors) = response.get("errors").and_then(Value::as_struct) else {
        return BTreeMap::new();
    };
    errors
        .iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                Value::String(s) => vec![s.clone()],
                _ => Vec::new(),
            };
            (field.clone(), messages)
        })
        .filter(|(_, messages)| !messages.is_empty())
        .collect()
}

fn parse_document_state(response: &Value) -> Result<DocumentState, VendorError> {
    let field_errors = parse_field_errors(response);
    if !field_errors.is_empty() {
        return Ok(DocumentState {
            field_errors,
            ..DocumentState::default()
        });
    }
    ensure_ok(response)?;

    let document = first_document(response)
        .ok_or_else(|| VendorError::Decode("document.get carries no documents".to_string()))?;

    Ok(DocumentState {
        is_pending: document.get("is_pending").and_then(Value::as_i64),
        percent_match: document.get("percent_match").and_then(Value::as_i64),
        report_id: first_part_id(document),
        field_errors,
    })
}

fn first_part_id(document: &Value) -> Option<i64> {
    document
        .get("parts")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .and_then(|p| p.get("id"))
        .and_then(Value::as_i64)
}

fn parse_report_id(response: &Value) -> Result<i64, VendorError> {
    first_document(response)
        .and_then(first_part_id)
        .ok_or_else(|| VendorError::Unavailable("report ID".to_string()))
}

fn parse_report_url(response: &Value) -> Result<String, VendorError> {
    response
        .get("report_url")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| VendorError::Unavailable("report URL".to_string()))
}

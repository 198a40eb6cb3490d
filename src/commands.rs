//! CLI command handlers.
//!
//! Each `run_*` function performs one command and prints its result to
//! stdout. Notices raised during the command are printed afterwards by
//! [`print_notices`].

use std::sync::Arc;

use anyhow::{bail, Result};

use ithenticate_core::entity::{Author, ContentEntity, FileRef, Profile};
use ithenticate_core::models::{DocumentRecord, NODE_ENTITY_TYPE};
use ithenticate_core::notice::{Notice, RecordingNotifier, TracingNotifier};

use crate::config::Config;
use crate::session::{self, CredentialOverrides};

/// Entity addressed on the command line.
#[derive(Debug, Clone)]
pub struct EntityArgs {
    pub bundle: String,
    pub entity_id: i64,
    pub revision: Option<i64>,
}

/// Paper to submit.
#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub entity: EntityArgs,
    pub title: String,
    pub file: String,
    pub authors: Vec<Author>,
    pub owner: Option<Profile>,
}

impl SubmitArgs {
    pub fn to_entity(&self) -> ContentEntity {
        let filename = std::path::Path::new(&self.file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.clone());

        let mut entity = ContentEntity::node(
            self.entity.bundle.clone(),
            self.entity.entity_id,
            self.title.clone(),
        )
        .with_file(FileRef {
            fid: self.entity.entity_id,
            filename,
            uri: self.file.clone(),
        });
        if let Some(rev) = self.entity.revision {
            entity = entity.with_revision(rev);
        }
        if !self.authors.is_empty() {
            entity = entity.with_authors(self.authors.clone());
        }
        if let Some(owner) = &self.owner {
            entity = entity.with_owner(owner.clone());
        }
        entity
    }
}

/// How `show` finds a record.
#[derive(Debug, Clone)]
pub enum ShowTarget {
    Entity(EntityArgs),
    DocumentId(i64),
    ReportId(i64),
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        println!("[{}] {}", notice.level, notice.message);
    }
}

pub fn print_record(record: &DocumentRecord) {
    println!("--- Document record ---");
    println!(
        "entity:        {} {} {}",
        record.entity_type().unwrap_or("?"),
        record.bundle().unwrap_or("?"),
        record
            .entity_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
    println!("revision:      {}", display_opt(record.revision_id()));
    println!("document_id:   {}", display_opt(record.document_id()));
    println!("report_id:     {}", display_opt(record.report_id()));
    println!("report_url:    {}", record.report_url().unwrap_or("-"));
    println!(
        "percent_match: {}",
        record
            .percent_match()
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string())
    );
}

fn display_opt(value: Option<i64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn run_sid(config: &Config, overrides: &CredentialOverrides) -> Result<()> {
    let wrapper = session::open_wrapper(config, overrides, Arc::new(TracingNotifier)).await?;
    println!("{}", wrapper.get_sid());
    Ok(())
}

pub async fn run_submit(
    config: &Config,
    overrides: &CredentialOverrides,
    args: &SubmitArgs,
) -> Result<()> {
    let notifier = Arc::new(RecordingNotifier::new());
    let wrapper = session::open_wrapper(config, overrides, notifier.clone()).await?;

    let result = wrapper.submit_document(&args.to_entity()).await;
    print_notices(&notifier.take());
    let record = result?;

    println!(
        "Submitted: document_id={}",
        display_opt(record.document_id())
    );
    Ok(())
}

pub async fn run_pending(
    config: &Config,
    overrides: &CredentialOverrides,
    document_id: i64,
) -> Result<()> {
    let wrapper = session::open_wrapper(config, overrides, Arc::new(TracingNotifier)).await?;

    let pending = wrapper.check_is_document_report_pending(document_id).await?;
    println!("{}", if pending { "pending" } else { "ready" });
    Ok(())
}

pub async fn run_report(
    config: &Config,
    overrides: &CredentialOverrides,
    entity: &EntityArgs,
) -> Result<()> {
    let notifier = Arc::new(RecordingNotifier::new());
    let wrapper = session::open_wrapper(config, overrides, notifier.clone()).await?;

    let Some(record) = DocumentRecord::load_by_entity_data(
        wrapper.store(),
        NODE_ENTITY_TYPE,
        &entity.bundle,
        entity.entity_id,
        entity.revision,
    )
    .await?
    else {
        bail!(
            "no document record for {} {} {}",
            NODE_ENTITY_TYPE,
            entity.bundle,
            entity.entity_id
        );
    };

    let result = wrapper.get_report_data(record).await;
    print_notices(&notifier.take());
    print_record(&result?);
    Ok(())
}

pub async fn run_show(config: &Config, target: &ShowTarget, json: bool) -> Result<()> {
    let store = session::open_store(config).await?;

    let record = match target {
        ShowTarget::Entity(entity) => {
            DocumentRecord::load_by_entity_data(
                &store,
                NODE_ENTITY_TYPE,
                &entity.bundle,
                entity.entity_id,
                entity.revision,
            )
            .await?
        }
        ShowTarget::DocumentId(id) => DocumentRecord::load_by_document_id(&store, *id).await?,
        ShowTarget::ReportId(id) => DocumentRecord::load_by_report_id(&store, *id).await?,
    };
    store.pool().close().await;

    match record {
        Some(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
        Some(record) => print_record(&record),
        None if json => println!("null"),
        None => println!("No document record found."),
    }
    Ok(())
}

pub async fn run_delete(config: &Config, entity: &EntityArgs) -> Result<()> {
    let store = session::open_store(config).await?;

    // Without --revision this removes the latest revision's row.
    let record = DocumentRecord::load_by_entity_data(
        &store,
        NODE_ENTITY_TYPE,
        &entity.bundle,
        entity.entity_id,
        entity.revision,
    )
    .await?;
    let removed = match record {
        Some(record) => record.delete(&store).await?,
        None => 0,
    };
    store.pool().close().await;

    println!("Deleted {} record(s).", removed);
    Ok(())
}

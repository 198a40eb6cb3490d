//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Maps the repository operations onto the `ithenticate_documents` table
//! created by [`migrate::create_schema`](crate::migrate::create_schema).

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use ithenticate_core::models::{DocumentRecord, EntityKey, RecordCriteria};
use ithenticate_core::store::DocumentStore;

const SELECT_COLUMNS: &str = "SELECT entity_type, bundle, entity_id, revision_id, \
     ithenticate_document_id, ithenticate_report_id, ithenticate_report_url, percent_match \
     FROM ithenticate_documents";

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_record(row: &SqliteRow) -> DocumentRecord {
    let revision: i64 = row.get("revision_id");
    let key = EntityKey {
        entity_type: row.get("entity_type"),
        bundle: row.get("bundle"),
        entity_id: row.get("entity_id"),
        revision_id: Some(revision),
    };
    DocumentRecord::from_parts(
        key,
        row.get("ithenticate_document_id"),
        row.get("ithenticate_report_id"),
        row.get("ithenticate_report_url"),
        row.get("percent_match"),
    )
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(&self, criteria: &RecordCriteria) -> Result<Option<DocumentRecord>> {
        let row = match criteria {
            RecordCriteria::DocumentId(id) => {
                let sql = format!(
                    "{} WHERE ithenticate_document_id = ? ORDER BY revision_id DESC LIMIT 1",
                    SELECT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            RecordCriteria::ReportId(id) => {
                let sql = format!(
                    "{} WHERE ithenticate_report_id = ? ORDER BY revision_id DESC LIMIT 1",
                    SELECT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            RecordCriteria::Entity {
                entity_type,
                bundle,
                entity_id,
                revision_id: Some(revision),
            } => {
                let sql = format!(
                    "{} WHERE entity_type = ? AND bundle = ? AND entity_id = ? AND revision_id = ?",
                    SELECT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(entity_type)
                    .bind(bundle)
                    .bind(*entity_id)
                    .bind(*revision)
                    .fetch_optional(&self.pool)
                    .await?
            }
            RecordCriteria::Entity {
                entity_type,
                bundle,
                entity_id,
                revision_id: None,
            } => {
                let sql = format!(
                    "{} WHERE entity_type = ? AND bundle = ? AND entity_id = ? \
                     ORDER BY revision_id DESC LIMIT 1",
                    SELECT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(entity_type)
                    .bind(bundle)
                    .bind(*entity_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(row.as_ref().map(row_to_record))
    }

    async fn upsert(&self, record: &DocumentRecord) -> Result<()> {
        let key = record.validate()?;

        sqlx::query(
            r#"
            INSERT INTO ithenticate_documents (entity_type, bundle, entity_id, revision_id,
                                               ithenticate_document_id, ithenticate_report_id,
                                               ithenticate_report_url, percent_match)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(entity_type, bundle, entity_id, revision_id) DO UPDATE SET
                ithenticate_document_id = excluded.ithenticate_document_id,
                ithenticate_report_id = excluded.ithenticate_report_id,
                ithenticate_report_url = excluded.ithenticate_report_url,
                percent_match = excluded.percent_match
            "#,
        )
        .bind(&key.entity_type)
        .bind(&key.bundle)
        .bind(key.entity_id)
        .bind(key.storage_revision())
        .bind(record.document_id())
        .bind(record.report_id())
        .bind(record.report_url())
        .bind(record.percent_match())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &EntityKey) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM ithenticate_documents \
             WHERE entity_type = ? AND bundle = ? AND entity_id = ? AND revision_id = ?",
        )
        .bind(&key.entity_type)
        .bind(&key.bundle)
        .bind(key.entity_id)
        .bind(key.storage_revision())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

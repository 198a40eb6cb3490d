use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the records table and its lookup indexes. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // revision_id 0 stands for "no revision" so the key stays NOT NULL
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ithenticate_documents (
            entity_type TEXT NOT NULL,
            bundle TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            revision_id INTEGER NOT NULL DEFAULT 0,
            ithenticate_document_id INTEGER NOT NULL,
            ithenticate_report_id INTEGER,
            ithenticate_report_url TEXT,
            percent_match INTEGER,
            PRIMARY KEY (entity_type, bundle, entity_id, revision_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ithenticate_document_id ON ithenticate_documents(ithenticate_document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ithenticate_report_id ON ithenticate_documents(ithenticate_report_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

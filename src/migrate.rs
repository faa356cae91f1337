use anyhow::Result;
use sqlx::SqlitePool;

/// Create the passage collection schema. Idempotent; `citeline init` may be
/// run any number of times.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            id TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            title TEXT NOT NULL,
            doi TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The duplicate check filters on source_file for every discovered PDF.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_passages_source_file ON passages(source_file)")
        .execute(pool)
        .await?;

    Ok(())
}

//! Passage store: the durable collection of embedded chunks.
//!
//! SQLite is the store of record; similarity queries are a brute-force
//! cosine scan over the stored vectors. Writes are transactional, keyed by
//! the deterministic chunk id (collisions overwrite in place, leaving
//! unrelated rows untouched).

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, ChunkMetadata, RetrievedPassage};

#[derive(Clone)]
pub struct PassageStore {
    pool: SqlitePool,
}

impl PassageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Total records in the collection.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whether any record exists for `{stem}.pdf`.
    ///
    /// Fail-open: if the query itself fails, inability to verify is treated
    /// as "not present", favoring re-embedding over silently skipping.
    pub async fn exists_for_source(&self, stem: &str) -> bool {
        let source_file = format!("{}.pdf", stem);
        let result: Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT 1 FROM passages WHERE source_file = ? LIMIT 1")
                .bind(&source_file)
                .fetch_optional(&self.pool)
                .await;

        match result {
            Ok(row) => row.is_some(),
            Err(e) => {
                eprintln!("Error checking for existing embeddings: {}", e);
                false
            }
        }
    }

    /// Append one file's chunks with their embeddings in a single
    /// transaction. An id collision overwrites that row in place.
    pub async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            bail!(
                "Chunk/embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            sqlx::query(
                r#"
                INSERT INTO passages (id, source_file, title, doi, page_number, text, embedding, ingested_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    source_file = excluded.source_file,
                    title = excluded.title,
                    doi = excluded.doi,
                    page_number = excluded.page_number,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    ingested_at = excluded.ingested_at
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.metadata.source_file)
            .bind(&chunk.metadata.title)
            .bind(&chunk.metadata.doi)
            .bind(chunk.metadata.page_number)
            .bind(&chunk.text)
            .bind(vec_to_blob(embedding))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Similarity search: top-k passages by cosine against the query
    /// embedding, best-first, ranks assigned 1..k.
    pub async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievedPassage>> {
        let rows = sqlx::query(
            "SELECT source_file, title, doi, page_number, text, embedding FROM passages",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, ChunkMetadata, String)> = rows
            .into_iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_embedding, &blob_to_vec(&blob));
                let metadata = ChunkMetadata {
                    source_file: row.get("source_file"),
                    title: row.get("title"),
                    doi: row.get("doi"),
                    page_number: row.get("page_number"),
                };
                (score, metadata, row.get("text"))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, metadata, text))| RetrievedPassage {
                text,
                metadata,
                rank: i + 1,
                score,
            })
            .collect())
    }
}

//! Core data models used throughout Citeline.
//!
//! These types represent the documents, chunks, and retrieved passages that
//! flow through the ingestion and answer pipelines.

use serde::{Deserialize, Serialize};

/// Sentinel title used when no title could be extracted from a PDF.
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Sentinel DOI used when no DOI could be extracted from a PDF.
pub const UNKNOWN_DOI: &str = "Unknown DOI";

/// Stable identity of a source document, extracted once at ingestion time.
///
/// The DOI is the preferred deduplication key; when it is the sentinel,
/// identity falls back to `(title, source_file)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentIdentity {
    /// File name of the PDF, including the `.pdf` extension.
    pub source_file: String,
    pub title: String,
    pub doi: String,
}

impl DocumentIdentity {
    pub fn unknown(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            title: UNKNOWN_TITLE.to_string(),
            doi: UNKNOWN_DOI.to_string(),
        }
    }
}

/// Plain text of a single PDF page, 1-based.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: i64,
    pub text: String,
}

/// Metadata carried by every chunk and returned with every retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,
    pub title: String,
    pub doi: String,
    pub page_number: i64,
}

/// A bounded window of page text, the unit of embedding and retrieval.
///
/// The id is derived deterministically from the document stem, the page
/// number, and the chunk's index within the document, so re-chunking the
/// same file produces the same ids.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A passage returned from a similarity query, best-first.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// 1-based position in the ranked result list.
    pub rank: usize,
    /// Cosine similarity against the query embedding.
    pub score: f32,
}

/// One entry in the deduplicated, numbered source list of an answer.
///
/// Ephemeral: recomputed per query. Within one answer, the same document
/// identity always maps to the same number.
#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    /// 1-based citation number, assigned in first-seen order.
    pub number: usize,
    pub doi: String,
    pub title: String,
    pub url: String,
    /// Human-readable page/source description, e.g. `Page: 3 (from x.pdf)`.
    pub page_info: String,
}

/// Counters reported after an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files that went through the full pipeline and were indexed.
    pub files_processed: usize,
    /// Files skipped because the ledger already listed them.
    pub skipped_by_ledger: usize,
    /// Files skipped because the store already held their chunks
    /// (the ledger is healed for these).
    pub skipped_by_store: usize,
    /// Files that yielded no pages or no chunks; retry-eligible.
    pub skipped_empty: usize,
    /// Files that failed mid-pipeline; retry-eligible.
    pub failed: usize,
    /// Total chunks written to the store this run.
    pub chunks_added: usize,
}

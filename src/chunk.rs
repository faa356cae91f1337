//! Fixed-window text chunker.
//!
//! Splits each page's text into overlapping character windows for
//! embedding. Window boundaries may split words; sizes are counted in
//! characters (not tokens) and sliced at char boundaries.
//!
//! Chunk ids are derived deterministically from the document stem, the
//! page number, and the chunk's index within the document, so re-chunking
//! an unchanged file reproduces the same ids.

use crate::config::ChunkingConfig;
use crate::models::{Chunk, ChunkMetadata, DocumentIdentity, PageText};

/// Chunk every page of a document, in page order.
/// Indices are contiguous starting at 0 across the whole document.
pub fn chunk_pages(
    stem: &str,
    identity: &DocumentIdentity,
    pages: &[PageText],
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut index = 0usize;

    for page in pages {
        if page.text.trim().is_empty() {
            continue;
        }
        for window in split_windows(&page.text, config.chunk_chars, config.overlap_chars) {
            chunks.push(Chunk {
                id: format!("{}_page{}_chunk{}", stem, page.page_number, index),
                text: window,
                metadata: ChunkMetadata {
                    source_file: identity.source_file.clone(),
                    title: identity.title.clone(),
                    doi: identity.doi.clone(),
                    page_number: page.page_number,
                },
            });
            index += 1;
        }
    }

    chunks
}

/// Overlapping windows over one page's text. Consecutive windows share
/// exactly `overlap` characters; the final window may be shorter.
fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size - overlap;

    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    windows
}

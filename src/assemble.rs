//! Citation assembly: turn ranked passages into a numbered context block
//! and a deduplicated source list.
//!
//! Numbering is stable within one query: the first time a document identity
//! is seen while scanning passages top-to-bottom it gets the next number,
//! and every later passage from the same document reuses it. The same
//! number may therefore label several non-contiguous context blocks.

use std::collections::HashMap;

use crate::models::{RetrievedPassage, SourceEntry, UNKNOWN_DOI};

/// Separator between numbered context blocks in the rendered prompt.
const BLOCK_SEPARATOR: &str = "\n---\n";

/// The numbered context fed to the model plus the source list for the
/// reference section. Recomputed per query.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub context_block: String,
    pub sources: Vec<SourceEntry>,
}

/// Deduplication key for a passage's document identity: DOI when known,
/// otherwise title + source file.
fn source_key(passage: &RetrievedPassage) -> String {
    if passage.metadata.doi != UNKNOWN_DOI {
        passage.metadata.doi.clone()
    } else {
        format!("{}_{}", passage.metadata.title, passage.metadata.source_file)
    }
}

/// External reference URL for a DOI, when it is resolvable.
pub fn doi_url(doi: &str) -> String {
    if doi != UNKNOWN_DOI && doi.starts_with("10.") {
        format!("https://doi.org/{}", doi)
    } else {
        "URL N/A".to_string()
    }
}

/// Build the numbered context block and deduplicated source list from
/// passages in ranked order.
pub fn assemble_context(passages: &[RetrievedPassage]) -> ContextBundle {
    let mut numbers_by_key: HashMap<String, usize> = HashMap::new();
    let mut sources = Vec::new();
    let mut blocks = Vec::new();

    for passage in passages {
        let key = source_key(passage);
        let number = match numbers_by_key.get(&key) {
            Some(&n) => n,
            None => {
                let n = sources.len() + 1;
                numbers_by_key.insert(key, n);
                sources.push(SourceEntry {
                    number: n,
                    doi: passage.metadata.doi.clone(),
                    title: passage.metadata.title.clone(),
                    url: doi_url(&passage.metadata.doi),
                    page_info: format!(
                        "Page: {} (from {})",
                        passage.metadata.page_number, passage.metadata.source_file
                    ),
                });
                n
            }
        };

        blocks.push(format!(
            "Source [{}] (Page: {}):\n{}",
            number, passage.metadata.page_number, passage.text
        ));
    }

    ContextBundle {
        context_block: blocks.join(BLOCK_SEPARATOR),
        sources,
    }
}

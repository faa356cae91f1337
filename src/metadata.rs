//! Document identity extraction.
//!
//! Combines the PDF's embedded Info metadata with a heuristic scan of the
//! first pages' text. Never fails the caller: extraction errors degrade to
//! the `Unknown Title` / `Unknown DOI` sentinels.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::models::{DocumentIdentity, UNKNOWN_DOI, UNKNOWN_TITLE};
use crate::pdf::PdfReader;

/// Pages scanned for a DOI when the Info dictionary has none.
const SCAN_PAGE_LIMIT: usize = 3;

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").unwrap());
static URL_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?://|www\.)").unwrap());
static DIGITS_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
/// Matches `word word,` or `word word and`, the shape of an author list.
static AUTHOR_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+\s+\w+(\s*,\s*|\s+and\s+))").unwrap());

/// Front-matter lines that are never a title.
const BOILERPLATE_LINES: &[&str] = &[
    "article",
    "research article",
    "review",
    "abstract",
    "introduction",
];

/// Extract the document identity for a PDF.
///
/// Tries the Info dictionary first, then falls back to scanning the first
/// pages' text. Any PDF access error is logged and the sentinels returned.
pub fn extract_identity(reader: &dyn PdfReader, path: &Path) -> DocumentIdentity {
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut identity = DocumentIdentity::unknown(source_file);

    match reader.read_info(path) {
        Ok(info) => {
            if let Some(title) = info.title {
                identity.title = title;
            }
            if let Some(doi) = info.doi {
                identity.doi = doi;
            }
        }
        Err(e) => eprintln!("Error reading PDF metadata for {}: {}", path.display(), e),
    }

    if identity.doi != UNKNOWN_DOI && identity.title != UNKNOWN_TITLE {
        return identity;
    }

    let pages = match reader.load_pages(path) {
        Ok(pages) => pages,
        Err(e) => {
            eprintln!("Error scanning PDF text for {}: {}", path.display(), e);
            return identity;
        }
    };

    for (i, page) in pages.iter().take(SCAN_PAGE_LIMIT).enumerate() {
        if identity.doi == UNKNOWN_DOI {
            if let Some(doi) = scan_doi(&page.text) {
                identity.doi = doi;
            }
        }
        if identity.title == UNKNOWN_TITLE && i == 0 {
            if let Some(title) = scan_title(&page.text) {
                identity.title = title;
            }
        }
    }

    identity
}

/// First DOI-shaped token anywhere in the text.
pub fn scan_doi(text: &str) -> Option<String> {
    DOI_RE.find(text).map(|m| m.as_str().to_string())
}

/// First line of the page that plausibly is the article title.
///
/// Skips short lines, boilerplate section labels, bare URLs, bare page
/// numbers, and lines shaped like an author list.
pub fn scan_title(first_page_text: &str) -> Option<String> {
    for line in first_page_text.lines() {
        let cleaned = line.trim();
        if cleaned.chars().count() <= 10 {
            continue;
        }
        if BOILERPLATE_LINES.contains(&cleaned.to_lowercase().as_str()) {
            continue;
        }
        if URL_LINE_RE.is_match(cleaned) || DIGITS_LINE_RE.is_match(cleaned) {
            continue;
        }
        if AUTHOR_LIST_RE.is_match(cleaned) {
            continue;
        }
        return Some(cleaned.to_string());
    }
    None
}

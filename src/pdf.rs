//! PDF access: per-page plain text plus embedded document metadata.
//!
//! Extraction is an external capability behind [`PdfReader`] so the
//! ingestion pipeline can be driven with fakes in tests. The shipped
//! implementation reads page text with `pdf-extract` and the Info
//! dictionary with `lopdf`.

use anyhow::{anyhow, Result};
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

use crate::models::PageText;

/// Title and DOI as recorded in the PDF's Info dictionary, when present.
#[derive(Debug, Clone, Default)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub doi: Option<String>,
}

pub trait PdfReader: Send + Sync {
    /// Plain text of every page, in order, 1-based page numbers.
    fn load_pages(&self, path: &Path) -> Result<Vec<PageText>>;

    /// Embedded document metadata. Missing keys are `None`, not errors.
    fn read_info(&self, path: &Path) -> Result<PdfInfo>;
}

/// Default reader backed by `pdf-extract` and `lopdf`.
pub struct PdfExtractReader;

impl PdfReader for PdfExtractReader {
    fn load_pages(&self, path: &Path) -> Result<Vec<PageText>> {
        let pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| anyhow!("PDF text extraction failed for {}: {}", path.display(), e))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i as i64 + 1,
                text,
            })
            .collect())
    }

    fn read_info(&self, path: &Path) -> Result<PdfInfo> {
        let doc = Document::load(path)
            .map_err(|e| anyhow!("Failed to open {}: {}", path.display(), e))?;

        let mut info = PdfInfo::default();
        if let Some(dict) = info_dictionary(&doc) {
            info.title = string_entry(&doc, dict, b"Title");
            // No standard key exists for DOIs; publishers use `doi` or `DOI`.
            info.doi = string_entry(&doc, dict, b"doi").or_else(|| string_entry(&doc, dict, b"DOI"));
        }
        Ok(info)
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn string_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let obj = match dict.get(key).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match obj {
        Object::String(bytes, _) => {
            let decoded = decode_pdf_string(bytes);
            let trimmed = decoded.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or single-byte
/// (PDFDocEncoding, decoded here as Latin-1).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

//! Answer post-processing: reference-flag handling and the reference section.
//!
//! The model is instructed to end its output with a `has_references` flag
//! line, but cannot be trusted to always comply. When the flag is present
//! it wins outright; otherwise inline `[n]` markers and known refusal
//! phrases decide whether a reference section is appended.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SourceEntry;

static FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)has_references:\s*(true|false)\s*$").unwrap());
static CITATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").unwrap());

/// Phrases whose presence means the model declined to answer from the
/// corpus, so no references should be shown.
const NO_REFERENCE_PHRASES: &[&str] = &[
    "not enough information found",
    "i am a material science assistant",
];

/// Strip a trailing `has_references: true|false` control line.
///
/// Returns the cleaned answer and the flag value when the line was present.
fn extract_reference_flag(raw: &str) -> (String, Option<bool>) {
    if let Some(captures) = FLAG_RE.captures(raw) {
        let flag = captures
            .get(1)
            .map(|m| m.as_str().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let end = captures.get(0).map(|m| m.start()).unwrap_or(raw.len());
        return (raw[..end].trim().to_string(), Some(flag));
    }
    (raw.trim().to_string(), None)
}

/// Infer the flag when the model omitted the control line: inline citation
/// markers mean references, known refusal phrases mean none, anything else
/// defaults to references.
fn infer_has_references(cleaned: &str) -> bool {
    if CITATION_RE.is_match(cleaned) {
        return true;
    }
    let lower = cleaned.to_lowercase();
    !NO_REFERENCE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Produce the final user-visible answer from the raw model output and the
/// sources retrieved for this query.
pub fn finalize_answer(raw: &str, sources: &[SourceEntry]) -> String {
    let (cleaned, explicit_flag) = extract_reference_flag(raw);

    if sources.is_empty() {
        return cleaned;
    }

    let has_references = explicit_flag.unwrap_or_else(|| infer_has_references(&cleaned));
    if !has_references {
        return cleaned;
    }

    let mut ordered: Vec<&SourceEntry> = sources.iter().collect();
    ordered.sort_by_key(|s| s.number);

    let mut out = cleaned;
    out.push_str("\n\n---\n**References:**\n");
    for src in ordered {
        out.push_str(&format!(
            "{}. **Title:** {}\n   **DOI:** {}\n   **URL:** {}\n   **Source Info:** {}\n",
            src.number, src.title, src.doi, src.url, src.page_info
        ));
    }
    out
}

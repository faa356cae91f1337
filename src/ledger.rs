//! Processed-files ledger.
//!
//! A JSON array of filenames already ingested, read at the start of every
//! run and written back exactly once at the end. The ledger is best-effort:
//! the store remains authoritative, so a missing or corrupt ledger file is
//! treated as empty rather than as an error.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Default, Clone)]
pub struct Ledger {
    entries: BTreeSet<String>,
}

impl Ledger {
    /// Read the ledger. Missing or unreadable content yields an empty set.
    pub fn load(path: &Path) -> Ledger {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Ledger::default(),
        };
        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(names) => Ledger {
                entries: names.into_iter().collect(),
            },
            Err(e) => {
                eprintln!(
                    "Processed-files ledger at {} is corrupt ({}); starting from an empty ledger",
                    path.display(),
                    e
                );
                Ledger::default()
            }
        }
    }

    /// Write the full ledger in one shot. Entries are sorted, so the file is
    /// byte-stable across runs with the same contents.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let names: Vec<&String> = self.entries.iter().collect();
        let content = serde_json::to_string(&names)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write ledger to {}", path.display()))
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.contains(file_name)
    }

    pub fn insert(&mut self, file_name: impl Into<String>) -> bool {
        self.entries.insert(file_name.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data").join("processed_files.json");

        let mut ledger = Ledger::default();
        ledger.insert("b.pdf");
        ledger.insert("a.pdf");
        ledger.save(&path).unwrap();

        let restored = Ledger::load(&path);
        assert_eq!(restored.len(), 2);
        assert!(restored.contains("a.pdf"));
        assert!(restored.contains("b.pdf"));
    }

    #[test]
    fn missing_file_is_empty() {
        let ledger = Ledger::load(Path::new("/nonexistent/processed_files.json"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("processed_files.json");
        std::fs::write(&path, "{not json").unwrap();
        let ledger = Ledger::load(&path);
        assert!(ledger.is_empty());
    }

    #[test]
    fn save_is_byte_stable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        let mut ledger = Ledger::default();
        ledger.insert("z.pdf");
        ledger.insert("a.pdf");
        ledger.save(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        ledger.save(&path).unwrap();
        assert_eq!(first, std::fs::read(&path).unwrap());
    }
}

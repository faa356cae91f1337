//! Ingestion coordination.
//!
//! Drives the per-file pipeline over every PDF in the source directory:
//! ledger check → store check → extract → chunk → embed → add. Failures are
//! isolated per file and leave the file retry-eligible; the ledger is
//! written exactly once, after the last file, so a crash mid-run can lose
//! this run's updates but never corrupts the ledger.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::chunk::chunk_pages;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::ledger::Ledger;
use crate::metadata;
use crate::models::IngestReport;
use crate::pdf::PdfReader;
use crate::store::PassageStore;

/// List the PDFs in a directory, non-recursively, sorted by file name for
/// deterministic processing order.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read PDF directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run one ingestion pass over the configured PDF directory.
///
/// At most one run should be active at a time; runs do not lock the ledger
/// or the store against each other.
pub async fn run_ingest(
    config: &Config,
    store: &PassageStore,
    embedder: &dyn Embedder,
    reader: &dyn PdfReader,
) -> Result<IngestReport> {
    let pdf_dir = &config.storage.pdf_dir;
    let mut report = IngestReport::default();

    if !pdf_dir.exists() {
        println!(
            "PDF directory {} not found. Please create it and add PDFs.",
            pdf_dir.display()
        );
        return Ok(report);
    }

    let files = discover_pdfs(pdf_dir)?;
    let mut ledger = Ledger::load(&config.storage.ledger_path);

    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        if ledger.contains(&file_name) {
            println!("Skipping already processed file: {}", file_name);
            report.skipped_by_ledger += 1;
            continue;
        }

        if store.exists_for_source(&stem).await {
            // The store already holds this file's chunks; heal the ledger
            // from store state without re-embedding.
            println!("Skipping {}: embeddings already exist in the store", file_name);
            ledger.insert(file_name);
            report.skipped_by_store += 1;
            continue;
        }

        println!("Processing {}...", file_name);
        match process_file(config, store, embedder, reader, path, &stem).await {
            Ok(Some(chunk_count)) => {
                ledger.insert(file_name.clone());
                report.files_processed += 1;
                report.chunks_added += chunk_count;
                println!(
                    "Successfully processed and indexed {} ({} chunks).",
                    file_name, chunk_count
                );
            }
            Ok(None) => {
                // Not an error: the file stays off the ledger and is
                // retried on the next run.
                println!("No text chunks generated for {}. Skipping.", file_name);
                report.skipped_empty += 1;
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", file_name, e);
                report.failed += 1;
            }
        }
    }

    ledger
        .save(&config.storage.ledger_path)
        .context("Failed to persist the processed-files ledger")?;

    println!(
        "\nIngestion complete. Newly processed files: {}. \
         Skipped (ledger): {}. Skipped (store): {}. Skipped (empty): {}. \
         Failed: {}. Total new chunks added: {}.",
        report.files_processed,
        report.skipped_by_ledger,
        report.skipped_by_store,
        report.skipped_empty,
        report.failed,
        report.chunks_added
    );
    match store.count().await {
        Ok(count) => println!("Total passages in the collection: {}", count),
        Err(e) => eprintln!("Could not read the collection size: {}", e),
    }

    Ok(report)
}

/// The per-file pipeline. `Ok(None)` means the file yielded no pages or no
/// chunks; any error aborts only this file.
async fn process_file(
    config: &Config,
    store: &PassageStore,
    embedder: &dyn Embedder,
    reader: &dyn PdfReader,
    path: &Path,
    stem: &str,
) -> Result<Option<usize>> {
    let identity = metadata::extract_identity(reader, path);

    let pages = reader.load_pages(path)?;
    if pages.is_empty() {
        return Ok(None);
    }

    let chunks = chunk_pages(stem, &identity, &pages, &config.chunking);
    if chunks.is_empty() {
        return Ok(None);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed(&texts).await?;
    store.add(&chunks, &embeddings).await?;

    Ok(Some(chunks.len()))
}

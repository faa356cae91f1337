//! # Citeline CLI
//!
//! The `citeline` binary drives the PDF question-answering service. It
//! provides commands for database initialization, PDF ingestion, one-shot
//! questions, and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! citeline --config ./config/citeline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `citeline init` | Create the SQLite database and run schema migrations |
//! | `citeline ingest` | Index new PDFs from the configured directory |
//! | `citeline ask "<question>"` | Answer one question and print it |
//! | `citeline serve` | Start the HTTP API |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use citeline::{chat, config, db, embedding, generate, ingest, migrate, pdf, server, store};

/// Citeline — ask questions of your scientific PDF library, with numbered
/// citations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/citeline.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "citeline",
    about = "Citeline — ask questions of your scientific PDF library, with numbered citations",
    version,
    long_about = "Citeline ingests scientific PDF articles into a local vector index and \
    answers natural-language questions by retrieving relevant passages and synthesizing a \
    cited answer through a language model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/citeline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the passages table. Idempotent:
    /// running it multiple times is safe.
    Init,

    /// Ingest PDFs from the configured directory.
    ///
    /// Scans the PDF directory non-recursively, skips files already in the
    /// processed-files ledger or the store, and indexes the rest: metadata
    /// extraction, chunking, one batch embedding call per file, and a
    /// transactional store write. Failed files are retried on the next run.
    Ingest,

    /// Answer one question and print the cited answer.
    Ask {
        /// The question to answer from the indexed papers.
        question: String,
    },

    /// Start the HTTP API.
    ///
    /// Serves `POST /ingest`, `POST /chat`, and `GET /health` on the
    /// configured bind address.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.storage.db_path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest => {
            let pool = db::connect(&cfg.storage.db_path).await?;
            migrate::run_migrations(&pool).await?;
            let store = store::PassageStore::new(pool);
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            ingest::run_ingest(&cfg, &store, embedder.as_ref(), &pdf::PdfExtractReader).await?;
        }
        Commands::Ask { question } => {
            let pool = db::connect(&cfg.storage.db_path).await?;
            let store = store::PassageStore::new(pool);
            if store.count().await.unwrap_or(0) == 0 {
                println!("The passage collection is empty. Run `citeline ingest` first.");
                return Ok(());
            }
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let generator = generate::create_generator(&cfg.generation)?;
            let answer = chat::answer_question(
                &store,
                embedder.as_ref(),
                generator.as_ref(),
                &question,
                cfg.retrieval.top_k,
            )
            .await?;
            println!("{}", answer);
        }
        Commands::Serve => {
            let pool = db::connect(&cfg.storage.db_path).await?;
            let store = store::PassageStore::new(pool);
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let generator = generate::create_generator(&cfg.generation)?;
            let state = server::AppState {
                config: Arc::new(cfg),
                store,
                embedder,
                generator,
                reader: Arc::new(pdf::PdfExtractReader),
            };
            server::run_server(state).await?;
        }
    }

    Ok(())
}

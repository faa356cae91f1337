//! # Citeline
//!
//! Ask questions of your scientific PDF library, with numbered citations.
//!
//! Citeline ingests a directory of scientific PDF articles into a local
//! SQLite vector index, then answers natural-language questions by
//! retrieving relevant passages and synthesizing a cited answer through a
//! language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ PDF directory│──▶│  Ingestion    │──▶│  SQLite    │
//! │  (*.pdf)     │   │ extract+chunk │   │ passages   │
//! └──────────────┘   │  +embed       │   └─────┬─────┘
//!                    └──────────────┘         │
//!                          ┌──────────────────┤
//!                          ▼                  ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │(citeline)│       │ /chat    │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! Ingestion is idempotent: a processed-files ledger plus a store-side
//! existence check guarantee each PDF is embedded once, while failed or
//! empty files stay retry-eligible. Answers carry stable, deduplicated
//! citation numbers assigned in retrieval order.
//!
//! ## Quick Start
//!
//! ```bash
//! citeline init                   # create the database
//! citeline ingest                 # index ./pdf_documents
//! citeline ask "What drives residual stress in printed nitinol?"
//! citeline serve                  # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`pdf`] | Per-page text + embedded metadata access |
//! | [`metadata`] | Document identity extraction |
//! | [`chunk`] | Overlapping character-window chunking |
//! | [`ledger`] | Processed-files ledger |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generate`] | Generation provider abstraction |
//! | [`store`] | Passage store over SQLite |
//! | [`ingest`] | Ingestion coordination |
//! | [`assemble`] | Citation numbering + context assembly |
//! | [`answer`] | Answer post-processing |
//! | [`chat`] | The canonical answer pipeline |
//! | [`server`] | HTTP boundary |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod assemble;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod generate;
pub mod ingest;
pub mod ledger;
pub mod metadata;
pub mod migrate;
pub mod models;
pub mod pdf;
pub mod server;
pub mod store;

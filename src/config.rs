use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// SQLite database file holding the passage collection.
    pub db_path: PathBuf,
    /// Directory scanned (non-recursively) for `.pdf` files.
    pub pdf_dir: PathBuf,
    /// Processed-files ledger (JSON array of filenames).
    pub ledger_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target window size in characters.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    /// Characters shared between consecutive windows of one page stream.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_chunk_chars() -> usize {
    1000
}
fn default_overlap_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Passages fetched per similarity query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `gemini` or `openai`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `gemini` or `openai`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.5-flash-preview-05-20".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_chars == 0 {
        anyhow::bail!("chunking.chunk_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.chunk_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.chunk_chars");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be gemini or openai.",
            other
        ),
    }
    match config.generation.provider.as_str() {
        "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be gemini or openai.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}

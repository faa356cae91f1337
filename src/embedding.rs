//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and two concrete providers:
//! - **[`GeminiEmbedder`]** — Google's `batchEmbedContents` endpoint (default).
//! - **[`OpenAiEmbedder`]** — the OpenAI embeddings API.
//!
//! Both are called with the full chunk-text batch of one file during
//! ingestion, and with a single-element batch for query embedding.
//!
//! Also provides the vector utilities used by the store:
//! - [`vec_to_blob`] / [`blob_to_vec`] — little-endian f32 BLOB codec
//! - [`cosine_similarity`] — similarity between two embedding vectors
//!
//! # Retry Strategy
//!
//! Transient failures are retried with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;
}

/// Embed a single query text.
///
/// Convenience wrapper around [`Embedder::embed`] for the retrieval path.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let results = embedder.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty embedding response"))
}

/// Create the configured [`Embedder`].
///
/// # Errors
///
/// Returns an error for unknown provider names or a missing API key.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Shared retry loop over one HTTP attempt closure.
///
/// `send` issues the request; a `Retryable` outcome is retried with
/// exponential backoff until `max_retries` is exhausted.
pub(crate) enum Attempt<T> {
    Done(T),
    Retryable(anyhow::Error),
}

pub(crate) async fn with_retries<T, F, Fut>(max_retries: u32, mut send: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Attempt<T>>>,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match send().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Retryable(e) => {
                last_err = Some(e);
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("Request failed after retries")))
}

// ============ Gemini Provider ============

/// Embedding provider using the Google Generative Language API.
///
/// Calls `POST models/{model}:batchEmbedContents` with the full text batch.
/// Requires the `GOOGLE_API_KEY` environment variable.
pub struct GeminiEmbedder {
    model: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| anyhow!("GOOGLE_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:batchEmbedContents?key={}",
            self.model, self.api_key
        );
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| {
                serde_json::json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": t }] }
                })
            })
            .collect();
        let body = serde_json::json!({ "requests": requests });

        let json = with_retries(self.max_retries, || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move { post_json(&client, &url, body, "Gemini embeddings").await }
        })
        .await?;

        parse_gemini_embeddings(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_gemini_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let values = embedding
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Invalid Gemini response: missing values"))?;
        let vec: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }
    Ok(result)
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    model: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let api_key = self.api_key.clone();
        let json = with_retries(self.max_retries, || {
            let client = self.client.clone();
            let body = body.clone();
            let api_key = api_key.clone();
            async move {
                let resp = client
                    .post("https://api.openai.com/v1/embeddings")
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(&body)
                    .send()
                    .await;
                classify_response(resp, "OpenAI embeddings").await
            }
        })
        .await?;

        parse_openai_embeddings(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vec);
    }
    Ok(embeddings)
}

// ============ Shared HTTP handling ============

pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: serde_json::Value,
    what: &str,
) -> Result<Attempt<serde_json::Value>> {
    let resp = client.post(url).json(&body).send().await;
    classify_response(resp, what).await
}

/// Map an HTTP outcome onto the retry policy: 429/5xx and network errors
/// are retryable, other client errors fail immediately.
pub(crate) async fn classify_response(
    resp: std::result::Result<reqwest::Response, reqwest::Error>,
    what: &str,
) -> Result<Attempt<serde_json::Value>> {
    match resp {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                let json: serde_json::Value = response.json().await?;
                return Ok(Attempt::Done(json));
            }

            let body_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                return Ok(Attempt::Retryable(anyhow!(
                    "{} error {}: {}",
                    what,
                    status,
                    body_text
                )));
            }
            bail!("{} error {}: {}", what, status, body_text);
        }
        Err(e) => Ok(Attempt::Retryable(anyhow!("{} request failed: {}", what, e))),
    }
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes for SQLite storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

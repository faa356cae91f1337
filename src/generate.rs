//! Generation provider abstraction and implementations.
//!
//! Defines the [`Generator`] trait with one operation: render a fully
//! assembled prompt into answer text. Providers mirror the embedding side:
//! Gemini (`generateContent`, the default) and OpenAI chat completions,
//! both with the same retry/backoff policy.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::embedding::{classify_response, post_json, with_retries};

#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate answer text for a fully rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Gemini Provider ============

/// Text generation via the Google Generative Language API.
///
/// Calls `POST models/{model}:generateContent`. Requires the
/// `GOOGLE_API_KEY` environment variable.
pub struct GeminiGenerator {
    model: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| anyhow!("GOOGLE_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature }
        });

        let json = with_retries(self.max_retries, || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move { post_json(&client, &url, body, "Gemini generation").await }
        })
        .await?;

        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidate text"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============ OpenAI Provider ============

/// Text generation via the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiGenerator {
    model: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });

        let api_key = self.api_key.clone();
        let json = with_retries(self.max_retries, || {
            let client = self.client.clone();
            let body = body.clone();
            let api_key = api_key.clone();
            async move {
                let resp = client
                    .post("https://api.openai.com/v1/chat/completions")
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(&body)
                    .send()
                    .await;
                classify_response(resp, "OpenAI generation").await
            }
        })
        .await?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing message content"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

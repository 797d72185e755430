//! Client for an OpenAI-compatible HTTP API, covering the two endpoints
//! this tool needs: `/embeddings` and `/chat/completions`.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::config::OpenAiConfig;
use crate::domain::language_model::{CompletionProvider, EmbeddingProvider};

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    completion_model: String,
    embedding_model: String,
    temperature: f32,
}

// Manual impl so the key never ends up in logs or error output
impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("completion_model", &self.completion_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Builds a client with the key taken from `OPENAI_API_KEY`.
    pub fn from_env(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("Set the {} environment variable", API_KEY_ENV_VAR))?;
        Ok(Self::with_api_key(config, api_key))
    }

    pub fn with_api_key(config: &OpenAiConfig, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            completion_model: config.completion_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
        }
    }

    async fn post_json(&self, endpoint: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.api_base, endpoint);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("API error from {}: {} - {}", url, status, error_body);
        }

        Ok(response)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let response = self.post_json("embeddings", body).await?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embeddings response")?;

        if parsed.data.len() != texts.len() {
            bail!(
                "Embeddings response has {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            );
        }

        // The API is allowed to return vectors out of order; restore
        // the input order via the index field.
        let mut data = parsed.data;
        data.sort_by_key(|entry| entry.index);
        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.completion_model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });

        let response = self.post_json("chat/completions", body).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion response contained no choices"))?;
        choice
            .message
            .content
            .ok_or_else(|| anyhow!("Chat completion choice contained no content"))
    }
}

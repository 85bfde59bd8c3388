//! Ollama client for embeddings and completions

use crate::llm::{CompletionClient, Embedder};
use crate::{EngineConfig, EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const BACKOFF_START_SECS: u64 = 1;
const BACKOFF_CAP_SECS: u64 = 10;

/// Client for a local Ollama server. Embeddings go through
/// `/api/embeddings`, completions through `/api/generate`.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    chat_model: String,
    embed_model: String,
    timeout: Duration,
    retries: u32,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_config(&EngineConfig {
            ollama_url: base_url.into(),
            ..EngineConfig::default()
        })
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.ollama_url.clone(),
            chat_model: config.chat_model.clone(),
            embed_model: config.embed_model.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
            retries: config.llm_retries,
        }
    }

    pub fn default_local() -> Self {
        Self::from_config(&EngineConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is reachable.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = OllamaGenerateRequest {
            model: self.chat_model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport_error)?
            .error_for_status()?
            .json::<OllamaGenerateResponse>()
            .await?;

        Ok(response.response)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = OllamaEmbedRequest {
            model: self.embed_model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport_error)?
            .error_for_status()?
            .json::<OllamaEmbedResponse>()
            .await?;

        debug!("Embedded {} chars -> {} dims", text.len(), response.embedding.len());
        Ok(response.embedding)
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    /// Generate a completion, retrying transport failures within the
    /// configured retry budget with doubling backoff.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let attempts = self.retries + 1;
        let mut backoff = Duration::from_secs(BACKOFF_START_SECS);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.generate_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("LLM call failed (attempt {}/{}): {}", attempt + 1, attempts, e);
                    last_error = Some(e);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(Duration::from_secs(BACKOFF_CAP_SECS));
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| EngineError::Processing("LLM call never attempted".into())))
    }
}

fn classify_transport_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::LlmTimeout(err.to_string())
    } else if err.is_connect() {
        EngineError::LlmUnavailable(err.to_string())
    } else {
        EngineError::Http(err)
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

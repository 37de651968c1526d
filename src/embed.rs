//! Embedding providers.
//!
//! The engine consumes embeddings through a narrow interface: batches of
//! text in, fixed-dimension vectors out, deterministic for the same text and
//! provider version. Two backends are shipped: an OpenAI-compatible HTTP API
//! (Ollama, vLLM, LiteLLM, ...) and a deterministic local feature-hashing
//! backend that keeps the full pipeline usable offline.

use std::time::Duration;

use serde::Deserialize;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{IndexError, Result};

/// A configured embedding backend
pub enum Embedder {
    Hash(HashEmbedder),
    Api(ApiEmbedder),
}

impl Embedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        match config.backend {
            EmbeddingBackend::Hash => Ok(Embedder::Hash(HashEmbedder::new(
                config.dimension(),
                config.identity(),
            ))),
            EmbeddingBackend::OpenaiApi => {
                let api = config.api.as_ref().ok_or_else(|| {
                    IndexError::EmbeddingProvider(
                        "backend 'openai-api' requires an [embedding.api] section".into(),
                    )
                })?;
                Ok(Embedder::Api(ApiEmbedder::new(
                    api.url.clone(),
                    api.resolve_api_key(),
                    config.model.clone(),
                    config.dimension(),
                    config.identity(),
                    config.max_retries,
                )))
            }
        }
    }

    /// Stable provider identity; vectors from different identities are
    /// incomparable and a mismatch with the manifest forces a full reindex.
    pub fn identity(&self) -> &str {
        match self {
            Embedder::Hash(e) => &e.identity,
            Embedder::Api(e) => &e.identity,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Embedder::Hash(e) => e.dimension,
            Embedder::Api(e) => e.dimension,
        }
    }

    /// Embed a batch of texts, same order as input. API failures are retried
    /// with exponential backoff before surfacing `EmbeddingProvider`.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Embedder::Hash(e) => Ok(texts.iter().map(|t| e.embed(t)).collect()),
            Embedder::Api(e) => e.embed_batch_with_retry(texts).await,
        }
    }

    /// Embed a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| IndexError::EmbeddingProvider("provider returned no vector".into()))
    }
}

/// Deterministic feature-hashing embedder.
///
/// Tokens are hashed into a fixed number of buckets and the resulting count
/// vector is L2-normalized, so cosine similarity reflects token overlap.
pub struct HashEmbedder {
    dimension: usize,
    identity: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize, identity: String) -> Self {
        Self {
            dimension,
            identity,
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

/// Lowercased alphanumeric tokens, split on everything else
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// OpenAI-compatible `/embeddings` client
pub struct ApiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    identity: String,
    max_retries: u32,
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

impl ApiEmbedder {
    pub fn new(
        url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
        identity: String,
        max_retries: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model,
            dimension,
            identity,
            max_retries,
        }
    }

    async fn embed_batch_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
            match self.embed_batch_once(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "embedding batch failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(IndexError::EmbeddingProvider(format!(
            "batch failed after {} attempts: {last_error}",
            self.max_retries + 1
        )))
    }

    async fn embed_batch_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(IndexError::EmbeddingProvider(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(IndexError::EmbeddingProvider(format!(
                "provider returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        for entry in &data {
            if entry.embedding.len() != self.dimension {
                return Err(IndexError::EmbeddingProvider(format!(
                    "provider returned dimension {}, expected {}",
                    entry.embedding.len(),
                    self.dimension
                )));
            }
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Exponential backoff: 250ms, 500ms, 1s, ... capped at 5s
fn backoff_delay(attempt: u32) -> Duration {
    let millis = 250u64.saturating_mul(1 << attempt.min(8));
    Duration::from_millis(millis.min(5_000))
}

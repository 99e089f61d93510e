//! HTTP-based embedder using an OpenAI-compatible embeddings endpoint

use super::cache::{embedding_cache_key, EmbeddingCache};
use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{MicroRagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedder that calls `POST {url}/v1/embeddings` (Ollama, vLLM, OpenAI, ...)
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
    cache: EmbeddingCache,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn from_config(config: &EmbeddingConfig, fallback_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| fallback_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            // all-MiniLM-L6-v2 width unless configured
            dimensions: config.dimensions.unwrap_or(384),
            api_key: config.api_key.clone(),
            cache: EmbeddingCache::new(),
        })
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/v1/embeddings", self.url);
        let mut req = self.http_client.post(&url).json(&EmbedRequest {
            model: &self.model,
            input: texts,
        });

        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MicroRagError::Embedding(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await?;
        if embed_response.data.len() != texts.len() {
            return Err(MicroRagError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embed_response.data.len()
            )));
        }

        Ok(embed_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let cache_key = embedding_cache_key(&self.model, text);
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!("Embedding cache hit");
            return Ok(cached);
        }

        let embedding = self
            .request_embeddings(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MicroRagError::Embedding("No embedding returned".to_string()))?;

        self.cache.set(cache_key, embedding.clone());
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

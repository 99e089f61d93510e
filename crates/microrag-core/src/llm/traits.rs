//! Capability traits for the external model services

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Embedding generation trait, used identically for indexing and querying
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Sampling parameters sent with every generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            max_output_tokens: 512,
        }
    }
}

/// Non-streaming generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub sampling: SamplingParams,
}

/// Why a single backend call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    /// The call did not complete within its timeout
    Timeout(String),
    /// Connection, HTTP status or decoding failure
    Other(String),
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailure::Timeout(msg) => write!(f, "timeout: {}", msg),
            BackendFailure::Other(msg) => f.write_str(msg),
        }
    }
}

impl From<reqwest::Error> for BackendFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendFailure::Timeout(e.to_string())
        } else {
            BackendFailure::Other(e.to_string())
        }
    }
}

/// Text generation backend reached over the network
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for the prompt, giving up after `timeout`
    async fn generate(
        &self,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> std::result::Result<String, BackendFailure>;

    /// Whether the backend is reachable
    async fn health(&self) -> bool;

    /// Get model name
    fn model_name(&self) -> &str;
}

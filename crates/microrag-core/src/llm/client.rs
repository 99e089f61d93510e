//! HTTP client for the Ollama generation API

use super::{BackendFailure, GenerationBackend, GenerationRequest};
use crate::config::LlmConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama-compatible generation backend (`POST /api/generate`)
pub struct OllamaBackend {
    http_client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaBackend {
    /// Create new client from configuration
    ///
    /// No client-wide timeout is set; each call carries its own.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder().build()?;

        Ok(Self {
            http_client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> std::result::Result<String, BackendFailure> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.sampling.temperature,
                top_p: request.sampling.top_p,
                num_predict: request.sampling.max_output_tokens,
            },
        };

        let url = format!("{}/api/generate", self.url);
        let response = self
            .http_client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendFailure::Other(format!(
                "LLM service error (HTTP {}): {}",
                status, text
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }

    async fn health(&self) -> bool {
        let url = format!("{}/api/tags", self.url);
        match self
            .http_client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::error!(error = %e, "LLM health check failed");
                false
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

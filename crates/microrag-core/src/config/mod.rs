//! Configuration management
//!
//! Settings are read from a YAML file. Every field has a default, and the
//! defaults for service endpoints and model names can be overridden through
//! `MICRORAG_*` environment variables.

use crate::error::{MicroRagError, Result};
use crate::generation::RetryPolicy;
use crate::llm::SamplingParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MICRORAG_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub guardrails: GuardrailConfig,

    #[serde(default)]
    pub cost: CostConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Ollama-compatible service
    #[serde(default = "default_llm_url")]
    pub url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Total attempts per generation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout of the first attempt; attempt `n` waits `n` times as long
    #[serde(default = "default_base_timeout")]
    pub base_timeout_secs: u64,

    /// Pause after a timed-out attempt
    #[serde(default = "default_timeout_backoff")]
    pub timeout_backoff_secs: u64,

    /// Pause after any other failed attempt
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            max_attempts: default_max_attempts(),
            base_timeout_secs: default_base_timeout(),
            timeout_backoff_secs: default_timeout_backoff(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

impl LlmConfig {
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_timeout: Duration::from_secs(self.base_timeout_secs),
            timeout_backoff: Duration::from_secs(self.timeout_backoff_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }
}

fn default_llm_url() -> String {
    std::env::var("MICRORAG_LLM_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
}

fn default_llm_model() -> String {
    std::env::var("MICRORAG_LLM_MODEL").unwrap_or_else(|_| "llama2".to_string())
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    512
}

fn default_max_attempts() -> u32 {
    3
}

/// One day; longer generation timeouts are a misconfiguration
const MAX_BASE_TIMEOUT_SECS: u64 = 86_400;

fn default_base_timeout() -> u64 {
    180
}

fn default_timeout_backoff() -> u64 {
    5
}

fn default_error_backoff() -> u64 {
    2
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL for embeddings (falls back to the LLM URL)
    #[serde(default = "default_embedding_url")]
    pub url: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default)]
    pub dimensions: Option<usize>,

    #[serde(default = "default_embedding_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimensions: None,
            api_key: default_embedding_api_key(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_url() -> Option<String> {
    std::env::var("MICRORAG_EMBEDDING_URL").ok()
}

fn default_embedding_model() -> String {
    std::env::var("MICRORAG_EMBEDDING_MODEL").unwrap_or_else(|_| "all-minilm".to_string())
}

fn default_embedding_api_key() -> Option<String> {
    std::env::var("MICRORAG_EMBEDDING_API_KEY").ok()
}

fn default_embedding_timeout() -> u64 {
    30
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages retrieved when the caller does not say
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// JSON snapshot of pre-embedded passages loaded into the in-memory index
    #[serde(default = "default_index_path")]
    pub index_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            index_path: default_index_path(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_index_path() -> Option<PathBuf> {
    std::env::var("MICRORAG_INDEX_PATH").ok().map(PathBuf::from)
}

/// Guardrail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Threshold of the post-generation groundedness check
    #[serde(default = "default_groundedness_threshold")]
    pub groundedness_threshold: f64,

    /// Threshold used when a caller does not pass one explicitly
    #[serde(default = "default_default_groundedness_threshold")]
    pub default_groundedness_threshold: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_query_length: default_max_query_length(),
            groundedness_threshold: default_groundedness_threshold(),
            default_groundedness_threshold: default_default_groundedness_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_query_length() -> usize {
    500
}

fn default_groundedness_threshold() -> f64 {
    0.3
}

fn default_default_groundedness_threshold() -> f64 {
    0.5
}

/// Per-token cost, in USD
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CostConfig {
    #[serde(default)]
    pub prompt_token_cost: f64,

    #[serde(default)]
    pub completion_token_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    std::env::var("MICRORAG_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily JSON log files; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load config from `$MICRORAG_CONFIG` or the default path
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::resolve_path())
    }

    /// Load and validate config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config as YAML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path the config is read from
    pub fn resolve_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.guardrails.max_query_length == 0 {
            return Err(MicroRagError::Config(
                "guardrails.max_query_length must be > 0".to_string(),
            ));
        }
        if !(1..=10).contains(&self.retrieval.top_k) {
            return Err(MicroRagError::Config(
                "retrieval.top_k must be between 1 and 10".to_string(),
            ));
        }
        for (name, value) in [
            (
                "guardrails.groundedness_threshold",
                self.guardrails.groundedness_threshold,
            ),
            (
                "guardrails.default_groundedness_threshold",
                self.guardrails.default_groundedness_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MicroRagError::Config(format!(
                    "{} must be in [0.0, 1.0]",
                    name
                )));
            }
        }
        if !(1..=MAX_BASE_TIMEOUT_SECS).contains(&self.llm.base_timeout_secs) {
            return Err(MicroRagError::Config(format!(
                "llm.base_timeout_secs must be between 1 and {}",
                MAX_BASE_TIMEOUT_SECS
            )));
        }
        if self.llm.max_attempts == 0 {
            return Err(MicroRagError::Config(
                "llm.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.cost.prompt_token_cost < 0.0 || self.cost.completion_token_cost < 0.0 {
            return Err(MicroRagError::Config(
                "token costs must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

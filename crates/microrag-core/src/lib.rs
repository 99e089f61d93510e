//! Microrag Core Library
//!
//! Guarded retrieval-augmented question answering over an indexed document
//! corpus.
//!
//! # Features
//! - Pre-generation guardrails: length, injection, domain and content safety
//! - Brute-force cosine retrieval over a pre-embedded in-memory index
//! - Grounded prompt construction with retry and escalating timeouts
//! - Post-generation groundedness scoring and sensitive-data sanitization
//! - Thread-safe latency, token and block-rate metrics

pub mod config;
pub mod error;
pub mod generation;
pub mod guardrail;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod retrieval;

pub use config::Config;
pub use error::{Error, MicroRagError, Result};
pub use generation::{Generation, GenerationOrchestrator, RetryPolicy};
pub use guardrail::{GroundednessResult, GuardrailEngine, GuardrailViolation, Policy, SanitizeMode};
pub use llm::{Embedder, GenerationBackend, HttpEmbedder, OllamaBackend};
pub use metrics::{MetricsRecorder, RequestMetric, Statistics};
pub use pipeline::{AnswerPipeline, Citation, PipelineAnswer, ResponseMetrics};
pub use retrieval::{InMemoryVectorIndex, Passage, Retriever, VectorIndex};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "microrag";

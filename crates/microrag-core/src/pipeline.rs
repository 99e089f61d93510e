//! Answer pipeline
//!
//! guardrail pre-check → retrieval → generation → groundedness check →
//! sanitization → citations. Every invocation, including blocked and failed
//! ones, is recorded in the shared [`MetricsRecorder`].

use crate::config::Config;
use crate::error::{MicroRagError, Result};
use crate::generation::{truncate_with_ellipsis, Generation, GenerationOrchestrator};
use crate::guardrail::{GroundednessResult, GuardrailEngine};
use crate::llm::{Embedder, GenerationBackend, HttpEmbedder, OllamaBackend};
use crate::metrics::{MetricsRecorder, RequestMetric};
use crate::retrieval::{InMemoryVectorIndex, Passage, Retriever, VectorIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Answer returned when retrieval finds nothing
pub const NO_INFORMATION_ANSWER: &str =
    "I could not find relevant information in the documents to answer your question.";

/// Banner prefixed to answers that fail the groundedness check
pub const LOW_GROUNDEDNESS_WARNING: &str =
    "[WARNING: This answer may not be fully based on the documents]";

/// Characters of passage text shown in a citation
pub const MAX_EXCERPT_CHARS: usize = 300;

/// Display-safe projection of a passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub excerpt: String,
    pub page: Option<u32>,
    pub score: f64,
}

impl From<&Passage> for Citation {
    fn from(passage: &Passage) -> Self {
        Self {
            source: passage.source.clone(),
            excerpt: truncate_with_ellipsis(&passage.text, MAX_EXCERPT_CHARS),
            page: passage.page,
            score: round_to(passage.score, 4),
        }
    }
}

/// Per-request metrics returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetrics {
    pub total_latency_ms: f64,
    pub retrieval_latency_ms: f64,
    pub llm_latency_ms: f64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
    pub top_k_used: usize,
    pub context_size: usize,
    pub groundedness_score: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Final answer with citations and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub metrics: ResponseMetrics,
    pub status: String,
}

/// Knobs the pipeline reads from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub guardrails_enabled: bool,
    pub groundedness_threshold: f64,
    pub default_top_k: usize,
    pub prompt_token_cost: f64,
    pub completion_token_cost: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            guardrails_enabled: true,
            groundedness_threshold: 0.3,
            default_top_k: 5,
            prompt_token_cost: 0.0,
            completion_token_cost: 0.0,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            guardrails_enabled: config.guardrails.enabled,
            groundedness_threshold: config.guardrails.groundedness_threshold,
            default_top_k: config.retrieval.top_k,
            prompt_token_cost: config.cost.prompt_token_cost,
            completion_token_cost: config.cost.completion_token_cost,
        }
    }
}

/// Composes the guardrail, retrieval and generation stages
pub struct AnswerPipeline {
    guardrails: GuardrailEngine,
    retriever: Retriever,
    generator: GenerationOrchestrator,
    metrics: Arc<MetricsRecorder>,
    settings: PipelineSettings,
}

impl AnswerPipeline {
    pub fn new(
        guardrails: GuardrailEngine,
        retriever: Retriever,
        generator: GenerationOrchestrator,
        metrics: Arc<MetricsRecorder>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            guardrails,
            retriever,
            generator,
            metrics,
            settings,
        }
    }

    /// Wire the HTTP embedder, the in-memory index and the Ollama backend
    /// from configuration
    pub fn from_config(config: &Config, metrics: Arc<MetricsRecorder>) -> Result<Self> {
        let embedder: Arc<dyn Embedder> =
            Arc::new(HttpEmbedder::from_config(&config.embedding, &config.llm.url)?);

        let index: Arc<dyn VectorIndex> = match config.retrieval.index_path {
            Some(ref path) => {
                let index = InMemoryVectorIndex::load(path)?;
                check_index_width(config.embedding.dimensions, index.dimensions())?;
                Arc::new(index)
            }
            None => {
                tracing::warn!("No retrieval.index_path configured; the index is empty");
                Arc::new(InMemoryVectorIndex::new())
            }
        };

        let backend: Arc<dyn GenerationBackend> = Arc::new(OllamaBackend::new(&config.llm)?);

        let guardrails = GuardrailEngine::new(config.guardrails.max_query_length)
            .with_default_threshold(config.guardrails.default_groundedness_threshold);
        let generator = GenerationOrchestrator::new(backend)
            .with_sampling(config.llm.sampling())
            .with_retry_policy(config.llm.retry_policy());

        Ok(Self::new(
            guardrails,
            Retriever::new(embedder, index),
            generator,
            metrics,
            PipelineSettings::from(config),
        ))
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub fn guardrails(&self) -> &GuardrailEngine {
        &self.guardrails
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Number of passages in the vector index
    pub fn documents_indexed(&self) -> usize {
        self.retriever.index().len()
    }

    pub fn embedding_model(&self) -> &str {
        self.retriever.embedder().model_name()
    }

    pub fn llm_model(&self) -> &str {
        self.generator.backend().model_name()
    }

    pub async fn backend_healthy(&self) -> bool {
        self.generator.backend().health().await
    }

    /// Answer a question, recording the outcome whatever path it takes
    pub async fn answer(&self, question: &str, top_k: Option<usize>) -> Result<PipelineAnswer> {
        let start = Instant::now();
        let top_k = top_k.unwrap_or(self.settings.default_top_k);
        let query_length = question.chars().count();

        tracing::info!(question = %question, top_k, "Received question");

        if self.settings.guardrails_enabled {
            if let Err(violation) = self.guardrails.validate(question) {
                tracing::warn!(violation = %violation.policy, "Query blocked by guardrail");
                self.metrics.record(RequestMetric::blocked(
                    query_length,
                    top_k,
                    elapsed_ms(start),
                    violation.policy.id(),
                ));
                return Err(violation.into());
            }
        }

        match self.run(question, top_k, start).await {
            Ok((answer, metric)) => {
                self.metrics.record(metric);
                tracing::info!(
                    total_latency_ms = answer.metrics.total_latency_ms,
                    citations = answer.citations.len(),
                    "Question processed successfully"
                );
                Ok(answer)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing question");
                self.metrics.record(RequestMetric::failed(
                    query_length,
                    top_k,
                    elapsed_ms(start),
                    e.kind(),
                ));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        question: &str,
        top_k: usize,
        start: Instant,
    ) -> Result<(PipelineAnswer, RequestMetric)> {
        let retrieval = self.retriever.retrieve(question, top_k).await?;
        let passages = retrieval.passages;

        let generation = if passages.is_empty() {
            Generation {
                answer: NO_INFORMATION_ANSWER.to_string(),
                latency_ms: 0.0,
                prompt_tokens: 0,
                completion_tokens: 0,
                attempts: 0,
            }
        } else {
            self.generator.answer(question, &passages).await?
        };

        let mut answer = generation.answer;
        let mut groundedness: Option<GroundednessResult> = None;

        if self.settings.guardrails_enabled && !passages.is_empty() {
            let result = self.guardrails.validate_response_groundedness(
                &answer,
                &passages,
                self.settings.groundedness_threshold,
            );
            if !result.is_grounded {
                tracing::warn!(
                    score = result.overlap_score,
                    question = %crate::guardrail::truncate_chars(question, 50),
                    "Low groundedness detected"
                );
                answer = format!("{}\n\n{}", LOW_GROUNDEDNESS_WARNING, answer);
            }
            groundedness = Some(result);
        }

        if self.settings.guardrails_enabled {
            answer = self.guardrails.sanitize_response(&answer, true).into_owned();
        }

        let citations: Vec<Citation> = passages.iter().map(Citation::from).collect();

        let total_latency_ms = elapsed_ms(start);
        let total_tokens = generation.prompt_tokens + generation.completion_tokens;
        let context_size: usize = passages.iter().map(|p| p.text.chars().count()).sum();
        let estimated_cost = generation.prompt_tokens as f64 * self.settings.prompt_token_cost
            + generation.completion_tokens as f64 * self.settings.completion_token_cost;

        let metrics = ResponseMetrics {
            total_latency_ms: round_to(total_latency_ms, 2),
            retrieval_latency_ms: round_to(retrieval.latency_ms, 2),
            llm_latency_ms: round_to(generation.latency_ms, 2),
            prompt_tokens: generation.prompt_tokens,
            completion_tokens: generation.completion_tokens,
            total_tokens,
            estimated_cost_usd: round_to(estimated_cost, 6),
            top_k_used: passages.len(),
            context_size,
            groundedness_score: groundedness.map(|g| round_to(g.overlap_score, 3)),
            timestamp: Utc::now(),
        };

        let record = RequestMetric {
            timestamp: metrics.timestamp,
            query_length: question.chars().count(),
            answer_length: answer.chars().count(),
            total_latency_ms,
            retrieval_latency_ms: retrieval.latency_ms,
            llm_latency_ms: generation.latency_ms,
            prompt_tokens: generation.prompt_tokens,
            completion_tokens: generation.completion_tokens,
            total_tokens,
            top_k,
            context_size,
            citations_count: citations.len(),
            blocked: false,
            blocked_reason: None,
            failed: false,
            failure_reason: None,
        };

        Ok((
            PipelineAnswer {
                answer,
                citations,
                metrics,
                status: "success".to_string(),
            },
            record,
        ))
    }
}

/// Reject a snapshot whose vectors cannot be compared with the configured embeddings
fn check_index_width(configured: Option<usize>, stored: Option<usize>) -> Result<()> {
    match (configured, stored) {
        (Some(configured), Some(stored)) if configured != stored => Err(MicroRagError::Config(
            format!(
                "embedding.dimensions is {} but the index snapshot stores {}-dimensional vectors",
                configured, stored
            ),
        )),
        _ => Ok(()),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

//! Generation orchestrator
//!
//! Builds a grounded prompt and drives the generation backend under a retry
//! policy with escalating per-attempt timeouts.

mod prompt;
mod retry;

pub use prompt::{
    build_prompt, estimate_tokens, truncate_with_ellipsis, MAX_PASSAGE_CHARS, MAX_PROMPT_PASSAGES,
};
pub use retry::{AttemptOutcome, FailureKind, RetryPolicy};

use crate::error::{MicroRagError, Result};
use crate::llm::{BackendFailure, GenerationBackend, GenerationRequest, SamplingParams};
use crate::retrieval::Passage;
use std::sync::Arc;
use std::time::Instant;

/// Generated answer with timing and estimated token usage
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub answer: String,
    pub latency_ms: f64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// 1-based attempt that succeeded
    pub attempts: u32,
}

/// Stateless generation stage, safe to share across requests
pub struct GenerationOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    sampling: SamplingParams,
    policy: RetryPolicy,
}

impl GenerationOrchestrator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            sampling: SamplingParams::default(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &dyn GenerationBackend {
        self.backend.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the prompt for `query` and generate an answer
    pub async fn answer(&self, query: &str, passages: &[Passage]) -> Result<Generation> {
        self.generate(&build_prompt(query, passages)).await
    }

    /// Generate an answer for a prepared prompt
    ///
    /// Makes at most `max_attempts` calls. Attempt `n` is bounded by
    /// `base_timeout * n`. Failed non-final attempts sleep for the backoff of
    /// their failure kind before retrying.
    pub async fn generate(&self, prompt: &str) -> Result<Generation> {
        let start = Instant::now();
        let prompt_tokens = estimate_tokens(prompt);
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            sampling: self.sampling,
        };

        let max_attempts = self.policy.max_attempts;
        for attempt in 1..=max_attempts {
            let timeout = self.policy.timeout_for(attempt);
            tracing::info!(
                attempt,
                timeout_secs = timeout.as_secs(),
                "Calling generation backend"
            );

            let result = match tokio::time::timeout(timeout, self.backend.generate(&request, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(BackendFailure::Timeout(format!(
                    "no response within {}s",
                    timeout.as_secs()
                ))),
            };

            match self.policy.classify(attempt, result) {
                AttemptOutcome::Success(answer) => {
                    let completion_tokens = estimate_tokens(&answer);
                    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                    tracing::info!(
                        latency_ms,
                        prompt_tokens,
                        completion_tokens,
                        attempt,
                        "Answer generated"
                    );
                    return Ok(Generation {
                        answer,
                        latency_ms,
                        prompt_tokens,
                        completion_tokens,
                        attempts: attempt,
                    });
                }
                AttemptOutcome::Retryable(kind) => {
                    let backoff = self.policy.backoff_for(kind);
                    match kind {
                        FailureKind::Timeout => tracing::warn!(
                            attempt,
                            timeout_secs = timeout.as_secs(),
                            "Generation backend timed out"
                        ),
                        FailureKind::Backend => tracing::warn!(
                            attempt,
                            "Generation backend call failed"
                        ),
                    }
                    tokio::time::sleep(backoff).await;
                }
                AttemptOutcome::Fatal(kind, message) => {
                    tracing::error!(attempt, error = %message, "Generation failed");
                    return Err(match kind {
                        FailureKind::Timeout => MicroRagError::GenerationTimeout { attempts: attempt },
                        FailureKind::Backend => MicroRagError::GenerationFailed {
                            attempts: attempt,
                            message,
                        },
                    });
                }
            }
        }

        Err(MicroRagError::GenerationFailed {
            attempts: 0,
            message: "retry policy allows no attempts".to_string(),
        })
    }
}

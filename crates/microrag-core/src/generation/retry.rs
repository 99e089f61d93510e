//! Retry policy and per-attempt outcome classification

use crate::llm::BackendFailure;
use std::time::Duration;

/// Class of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Backend,
}

/// Result of one backend attempt as seen by the retry loop
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(String),
    /// Failed, but attempts remain
    Retryable(FailureKind),
    /// Failed on the final attempt
    Fatal(FailureKind, String),
}

/// Attempt budget, escalating timeouts and backoff delays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_timeout: Duration,
    pub timeout_backoff: Duration,
    pub error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_timeout: Duration::from_secs(180),
            timeout_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Timeout for a 1-based attempt number, saturating at [`Duration::MAX`]
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    /// Timeouts of every attempt, in order
    pub fn timeout_schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts).map(|a| self.timeout_for(a)).collect()
    }

    /// Pause before the next attempt after a failure of this kind
    pub fn backoff_for(&self, kind: FailureKind) -> Duration {
        match kind {
            FailureKind::Timeout => self.timeout_backoff,
            FailureKind::Backend => self.error_backoff,
        }
    }

    /// Classify the result of attempt `attempt`
    pub fn classify(
        &self,
        attempt: u32,
        result: Result<String, BackendFailure>,
    ) -> AttemptOutcome {
        let (kind, message) = match result {
            Ok(answer) => return AttemptOutcome::Success(answer),
            Err(BackendFailure::Timeout(msg)) => (FailureKind::Timeout, msg),
            Err(BackendFailure::Other(msg)) => (FailureKind::Backend, msg),
        };

        if attempt >= self.max_attempts {
            AttemptOutcome::Fatal(kind, message)
        } else {
            AttemptOutcome::Retryable(kind)
        }
    }
}

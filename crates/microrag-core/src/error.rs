//! Error types for microrag

use crate::guardrail::GuardrailViolation;
use thiserror::Error;

/// Result type alias using MicroRagError
pub type Result<T> = std::result::Result<T, MicroRagError>;

/// Error type alias for convenience
pub type Error = MicroRagError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
    pub const QUERY_BLOCKED: i32 = 4;
}

/// Main error type for microrag
#[derive(Debug, Error)]
pub enum MicroRagError {
    #[error("Query blocked by {}: {}", .0.policy, .0.reason)]
    QueryBlocked(Box<GuardrailViolation>),

    #[error(
        "The language model did not respond after {attempts} attempts. \
         The model may still be warming up (the first load can take 5-10 minutes). \
         Try again in a few minutes."
    )]
    GenerationTimeout { attempts: u32 },

    #[error("Error communicating with the language model: {message}")]
    GenerationFailed { attempts: u32, message: String },

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MicroRagError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::QueryBlocked(_) => exit_codes::QUERY_BLOCKED,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Stable class name used in API error bodies and request metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueryBlocked(_) => "query_blocked",
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::InvalidInput(_) => "invalid_request",
            _ => "processing_failed",
        }
    }

    /// The guardrail violation, when this error is a blocked query
    pub fn violation(&self) -> Option<&GuardrailViolation> {
        match self {
            Self::QueryBlocked(v) => Some(v),
            _ => None,
        }
    }
}

impl From<GuardrailViolation> for MicroRagError {
    fn from(violation: GuardrailViolation) -> Self {
        Self::QueryBlocked(Box::new(violation))
    }
}

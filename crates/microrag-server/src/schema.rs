//! Request and response bodies of the HTTP API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use microrag_core::{GuardrailViolation, MicroRagError, RequestMetric, Statistics};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Longest accepted question, in characters
pub const MAX_QUESTION_CHARS: usize = 500;

/// Largest accepted `top_k`
pub const MAX_TOP_K: i64 = 10;

/// Body of `POST /api/v1/ask`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl AskRequest {
    /// Check field bounds and return the validated `top_k`
    pub fn validate(&self) -> Result<Option<usize>, ApiError> {
        let length = self.question.chars().count();
        if length == 0 || length > MAX_QUESTION_CHARS {
            return Err(ApiError::InvalidRequest(format!(
                "question must be between 1 and {} characters",
                MAX_QUESTION_CHARS
            )));
        }

        match self.top_k {
            None => Ok(None),
            Some(k) if (1..=MAX_TOP_K).contains(&k) => Ok(Some(k as usize)),
            Some(_) => Err(ApiError::InvalidRequest(format!(
                "top_k must be between 1 and {}",
                MAX_TOP_K
            ))),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub llm_status: String,
    pub documents_indexed: usize,
    pub embedding_model: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /api/v1/metrics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub statistics: Statistics,
    pub recent_requests: Vec<RequestMetric>,
    pub timestamp: DateTime<Utc>,
}

/// Error returned by a handler
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or out-of-range field (422)
    InvalidRequest(String),
    /// Rejected by a guardrail policy (400)
    Blocked(Box<GuardrailViolation>),
    /// Any other pipeline failure (500)
    Processing(String),
}

impl From<MicroRagError> for ApiError {
    fn from(err: MicroRagError) -> Self {
        match err {
            MicroRagError::QueryBlocked(violation) => ApiError::Blocked(violation),
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidRequest(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "invalid_request", "message": message }),
            ),
            ApiError::Blocked(violation) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "query_blocked", "violation": violation }),
            ),
            ApiError::Processing(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "processing_failed", "message": message }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question: &str, top_k: Option<i64>) -> AskRequest {
        AskRequest {
            question: question.to_string(),
            top_k,
        }
    }

    #[test]
    fn test_validate_bounds() {
        assert_eq!(request("What is covered?", None).validate().unwrap(), None);
        assert_eq!(request("q", Some(10)).validate().unwrap(), Some(10));
        assert!(request("", None).validate().is_err());
        assert!(request("q", Some(0)).validate().is_err());
        assert!(request("q", Some(11)).validate().is_err());
        assert!(request("q", Some(-3)).validate().is_err());
    }

    #[test]
    fn test_question_length_counts_chars() {
        let accented = "é".repeat(MAX_QUESTION_CHARS);
        assert!(request(&accented, None).validate().is_ok());
        let too_long = "é".repeat(MAX_QUESTION_CHARS + 1);
        assert!(request(&too_long, None).validate().is_err());
    }

    #[test]
    fn test_top_k_is_optional_in_json() {
        let parsed: AskRequest = serde_json::from_str(r#"{"question": "hi"}"#).unwrap();
        assert_eq!(parsed.top_k, None);
    }
}

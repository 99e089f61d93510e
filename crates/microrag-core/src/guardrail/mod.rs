//! Guardrail engine
//!
//! Validates incoming questions against five policies and checks generated
//! answers for groundedness and sensitive data.
//!
//! Query checks run in a fixed order and stop at the first violation:
//! 1. length
//! 2. prompt injection
//! 3. domain restriction (sensitive keywords)
//! 4. data protection (structured sensitive data)
//! 5. content safety (keyword plus suspicious context)

mod groundedness;
pub mod patterns;
mod sanitize;

pub use groundedness::GroundednessResult;
pub use sanitize::SanitizeMode;

use patterns::{CONTENT_SAFETY_REGEXES, DOMAIN_KEYWORDS, INJECTION_REGEXES, SENSITIVE_REGEXES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy that a query can violate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    #[serde(rename = "MAX_LENGTH_POLICY")]
    MaxLength,
    #[serde(rename = "INJECTION_PREVENTION_POLICY")]
    InjectionPrevention,
    #[serde(rename = "DOMAIN_RESTRICTION_POLICY")]
    DomainRestriction,
    #[serde(rename = "DATA_PROTECTION_POLICY")]
    DataProtection,
    #[serde(rename = "CONTENT_SAFETY_POLICY")]
    ContentSafety,
}

impl Policy {
    /// Policy identifier as exposed to clients
    pub fn id(&self) -> &'static str {
        match self {
            Policy::MaxLength => "MAX_LENGTH_POLICY",
            Policy::InjectionPrevention => "INJECTION_PREVENTION_POLICY",
            Policy::DomainRestriction => "DOMAIN_RESTRICTION_POLICY",
            Policy::DataProtection => "DATA_PROTECTION_POLICY",
            Policy::ContentSafety => "CONTENT_SAFETY_POLICY",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Record of a blocked query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailViolation {
    pub blocked: bool,
    pub reason: String,
    pub policy: Policy,
    pub message: String,
}

impl GuardrailViolation {
    fn new(policy: Policy, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            blocked: true,
            reason: reason.into(),
            policy,
            message: message.into(),
        }
    }
}

/// Stateless policy engine, safe to share across concurrent requests
#[derive(Debug, Clone)]
pub struct GuardrailEngine {
    max_query_length: usize,
    default_groundedness_threshold: f64,
}

impl Default for GuardrailEngine {
    fn default() -> Self {
        Self::new(500)
    }
}

impl GuardrailEngine {
    pub fn new(max_query_length: usize) -> Self {
        Self {
            max_query_length,
            default_groundedness_threshold: 0.5,
        }
    }

    /// Override the threshold used by [`Self::check_groundedness`]
    pub fn with_default_threshold(mut self, threshold: f64) -> Self {
        self.default_groundedness_threshold = threshold;
        self
    }

    pub fn max_query_length(&self) -> usize {
        self.max_query_length
    }

    pub fn default_groundedness_threshold(&self) -> f64 {
        self.default_groundedness_threshold
    }

    /// Validate a query with the configured maximum length
    pub fn validate(&self, query: &str) -> Result<(), GuardrailViolation> {
        self.validate_query(query, self.max_query_length)
    }

    /// Validate a query against every policy, in order
    ///
    /// Only the first violation is reported.
    pub fn validate_query(&self, query: &str, max_length: usize) -> Result<(), GuardrailViolation> {
        let length = query.chars().count();
        if length > max_length {
            return Err(GuardrailViolation::new(
                Policy::MaxLength,
                "Query too long",
                format!(
                    "The question exceeds the maximum allowed length of {} characters.",
                    max_length
                ),
            ));
        }

        let query_lower = query.to_lowercase();

        if let Some((pattern, _)) = INJECTION_REGEXES
            .iter()
            .find(|(_, re)| re.is_match(&query_lower))
        {
            tracing::warn!(pattern = pattern.name, "Prompt injection pattern matched");
            return Err(GuardrailViolation::new(
                Policy::InjectionPrevention,
                "Prompt injection attempt detected",
                "Your question contains patterns that violate our security policies. \
                 Please rephrase your question.",
            ));
        }

        if DOMAIN_KEYWORDS.iter().any(|k| query_lower.contains(k)) {
            return Err(GuardrailViolation::new(
                Policy::DomainRestriction,
                "Request for sensitive or out-of-domain information",
                "Your question asks for sensitive information or information outside the \
                 scope of the available documents. I cannot provide this kind of information.",
            ));
        }

        if let Some((pattern, _)) = SENSITIVE_REGEXES.iter().find(|(_, re)| re.is_match(query)) {
            tracing::warn!(kind = ?pattern.kind, "Sensitive data pattern in query");
            return Err(GuardrailViolation::new(
                Policy::DataProtection,
                "Sensitive data pattern detected in query",
                "Your question contains sensitive data patterns. \
                 Please remove personal information from the question.",
            ));
        }

        for (rule, context) in CONTENT_SAFETY_REGEXES.iter() {
            if !query_lower.contains(rule.keyword) {
                continue;
            }

            if context.is_match(&query_lower) {
                tracing::warn!(
                    keyword = rule.keyword,
                    severity = rule.severity.as_str(),
                    query = %truncate_chars(query, 50),
                    "Suspicious content detected"
                );
                return Err(GuardrailViolation::new(
                    Policy::ContentSafety,
                    format!(
                        "Inappropriate content with suspicious context: {}",
                        rule.keyword
                    ),
                    "Your question contains inappropriate or potentially malicious content.",
                ));
            }

            tracing::info!(
                keyword = rule.keyword,
                query = %truncate_chars(query, 50),
                "Flagged keyword in safe context"
            );
        }

        Ok(())
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

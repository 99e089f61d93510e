//! Answer sanitization

use super::patterns::{SensitiveKind, SENSITIVE_REGEXES};
use super::GuardrailEngine;
use std::borrow::Cow;

/// How sensitive data in an answer is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizeMode {
    /// Replace every match with a redaction placeholder
    Aggressive,
    /// Leave the text untouched and only report matches; document content may
    /// legitimately contain these patterns
    #[default]
    Contextual,
}

impl SanitizeMode {
    pub fn from_preserve_flag(preserve_context_data: bool) -> Self {
        if preserve_context_data {
            SanitizeMode::Contextual
        } else {
            SanitizeMode::Aggressive
        }
    }
}

impl GuardrailEngine {
    /// Sanitize an answer; `preserve_context_data` selects contextual mode
    pub fn sanitize_response<'a>(&self, answer: &'a str, preserve_context_data: bool) -> Cow<'a, str> {
        self.sanitize(answer, SanitizeMode::from_preserve_flag(preserve_context_data))
    }

    pub fn sanitize<'a>(&self, answer: &'a str, mode: SanitizeMode) -> Cow<'a, str> {
        match mode {
            SanitizeMode::Aggressive => redact(answer),
            SanitizeMode::Contextual => {
                let counts: Vec<(SensitiveKind, usize)> = SENSITIVE_REGEXES
                    .iter()
                    .filter(|(p, _)| p.redaction.is_some())
                    .map(|(p, re)| (p.kind, re.find_iter(answer).count()))
                    .filter(|(_, n)| *n > 0)
                    .collect();

                if !counts.is_empty() {
                    tracing::warn!(matches = ?counts, "Sensitive data in response");
                }
                Cow::Borrowed(answer)
            }
        }
    }
}

fn redact(answer: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(answer);
    for (pattern, re) in SENSITIVE_REGEXES.iter() {
        let Some(replacement) = pattern.redaction else {
            continue;
        };
        let replaced = match re.replace_all(&text, replacement) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = replaced {
            text = Cow::Owned(s);
        }
    }
    text
}

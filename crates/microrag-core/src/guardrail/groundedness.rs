//! Vocabulary-overlap groundedness heuristic

use super::patterns::{STOPWORDS, WORD_RE};
use super::GuardrailEngine;
use crate::retrieval::Passage;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of a groundedness check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroundednessResult {
    pub is_grounded: bool,
    pub overlap_score: f64,
}

impl GroundednessResult {
    fn ungrounded() -> Self {
        Self {
            is_grounded: false,
            overlap_score: 0.0,
        }
    }
}

/// Lower-cased word tokens longer than three characters, minus stopwords
fn significant_words(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| w.chars().count() > 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

impl GuardrailEngine {
    /// Check groundedness using the engine's default threshold
    pub fn check_groundedness(&self, answer: &str, passages: &[Passage]) -> GroundednessResult {
        self.validate_response_groundedness(answer, passages, self.default_groundedness_threshold)
    }

    /// Share of the answer's significant words that also occur in the passages
    ///
    /// Returns `(false, 0.0)` when there are no passages or the answer has no
    /// significant words.
    pub fn validate_response_groundedness(
        &self,
        answer: &str,
        passages: &[Passage],
        threshold: f64,
    ) -> GroundednessResult {
        if passages.is_empty() {
            return GroundednessResult::ungrounded();
        }

        let answer_words = significant_words(answer);
        if answer_words.is_empty() {
            return GroundednessResult::ungrounded();
        }

        let source_text = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let source_words = significant_words(&source_text);

        let overlap = answer_words.intersection(&source_words).count();
        let overlap_score = overlap as f64 / answer_words.len() as f64;
        let is_grounded = overlap_score >= threshold;

        tracing::info!(
            overlap_score = (overlap_score * 1000.0).round() / 1000.0,
            is_grounded,
            response_words = answer_words.len(),
            overlap_words = overlap,
            "Groundedness check"
        );

        GroundednessResult {
            is_grounded,
            overlap_score,
        }
    }
}

//! CLI command handlers

pub mod ask;
pub mod check;
pub mod config;
pub mod serve;

use anyhow::Result;
use microrag_core::MicroRagError;

/// Join positional words into one query, rejecting an empty result
pub(crate) fn join_words(words: &[String]) -> Result<String> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(MicroRagError::InvalidInput("query must not be empty".to_string()).into());
    }
    Ok(text)
}

//! Retrieval orchestrator
//!
//! Embeds the question, asks the vector index for the `k` nearest passages
//! and converts cosine distances into relevance scores (`1 - distance`).

mod memory;

pub use memory::{cosine_similarity, IndexEntry, InMemoryVectorIndex};

use crate::error::{MicroRagError, Result};
use crate::llm::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Raw nearest-neighbour hit returned by a [`VectorIndex`]
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    /// Cosine distance, smaller is more similar
    pub distance: f64,
}

/// Nearest-neighbour search over pre-embedded passages
///
/// Implementations must return hits sorted by ascending distance; the
/// generation stage relies on that order when it keeps the first few
/// passages.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>>;

    /// Number of indexed passages
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Retrieved passage with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    pub score: f64,
    pub distance: f64,
}

impl From<IndexHit> for Passage {
    fn from(hit: IndexHit) -> Self {
        Self {
            score: 1.0 - hit.distance,
            text: hit.text,
            source: hit.source,
            page: hit.page,
            distance: hit.distance,
        }
    }
}

/// Passages plus the wall-clock time of the embed and query round trip
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub passages: Vec<Passage>,
    pub latency_ms: f64,
}

/// Stateless retrieval stage, safe to share across requests
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Retrieve the `k` most relevant passages for a query
    ///
    /// An index with no results yields an empty list, not an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        let start = Instant::now();

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MicroRagError::Retrieval(format!("query embedding failed: {}", e)))?;

        let hits = self
            .index
            .query(&embedding, k)
            .await
            .map_err(|e| MicroRagError::Retrieval(format!("vector index query failed: {}", e)))?;

        let passages: Vec<Passage> = hits.into_iter().map(Passage::from).collect();
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(count = passages.len(), latency_ms, "Documents retrieved");

        Ok(Retrieval {
            passages,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_from_distance() {
        let passage = Passage::from(IndexHit {
            text: "t".to_string(),
            source: "s".to_string(),
            page: None,
            distance: 0.2,
        });
        assert_eq!(passage.score, 0.8);
        assert_eq!(passage.distance, 0.2);
    }

    #[test]
    fn test_negative_score_for_opposite_vectors() {
        let passage = Passage::from(IndexHit {
            text: "t".to_string(),
            source: "s".to_string(),
            page: Some(3),
            distance: 1.5,
        });
        assert_eq!(passage.score, -0.5);
    }
}

//! In-memory [`VectorIndex`] over pre-embedded passages
//!
//! Brute-force cosine distance over every stored vector. Entries can be
//! loaded from a JSON snapshot produced by an external ingestion job.

use super::{IndexHit, VectorIndex};
use crate::error::{MicroRagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

/// Stored passage with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub page: Option<u32>,
    pub embedding: Vec<f32>,
}

/// Thread-safe in-memory vector index
pub struct InMemoryVectorIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Load a JSON array of [`IndexEntry`] values
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<IndexEntry> = serde_json::from_str(&content)?;

        if let Some(first) = entries.first() {
            let dims = first.embedding.len();
            if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dims) {
                return Err(MicroRagError::InvalidInput(format!(
                    "index snapshot {} mixes embedding widths ({} vs {} in {})",
                    path.display(),
                    dims,
                    bad.embedding.len(),
                    bad.source
                )));
            }
        }

        tracing::info!(path = %path.display(), entries = entries.len(), "Loaded vector index snapshot");
        Ok(Self::from_entries(entries))
    }

    /// Write the current entries as a JSON snapshot
    pub fn save(&self, path: &Path) -> Result<()> {
        let entries = self
            .entries
            .read()
            .map_err(|_| MicroRagError::Retrieval("index lock poisoned".to_string()))?;
        let json = serde_json::to_string(&*entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Embedding width of the stored entries, `None` when empty
    pub fn dimensions(&self) -> Option<usize> {
        self.entries
            .read()
            .ok()
            .and_then(|e| e.first().map(|entry| entry.embedding.len()))
    }

    pub fn insert(&self, entry: IndexEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(entry);
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity; zero for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| MicroRagError::Retrieval("index lock poisoned".to_string()))?;

        if let Some(stored) = entries.iter().find(|e| e.embedding.len() != embedding.len()) {
            return Err(MicroRagError::Retrieval(format!(
                "query embedding has {} dimensions but the index stores {} (entry {})",
                embedding.len(),
                stored.embedding.len(),
                stored.source
            )));
        }

        let mut scored: Vec<(f64, &IndexEntry)> = entries
            .iter()
            .map(|e| (1.0 - cosine_similarity(embedding, &e.embedding) as f64, e))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, e)| IndexHit {
                text: e.text.clone(),
                source: e.source.clone(),
                page: e.page,
                distance,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(source: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            text: format!("text of {}", source),
            source: source.to_string(),
            page: Some(1),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_ascending_distance() {
        let index = InMemoryVectorIndex::from_entries(vec![
            entry("far", vec![0.0, 1.0]),
            entry("near", vec![1.0, 0.0]),
            entry("middle", vec![1.0, 1.0]),
        ]);

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "near");
        assert_eq!(hits[1].source, "middle");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = InMemoryVectorIndex::new();
        assert!(index.is_empty());
        assert!(index.query(&[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_rejects_mismatched_width() {
        let index = InMemoryVectorIndex::from_entries(vec![entry("unrelated", vec![0.2, 0.4, 0.6])]);
        assert_eq!(index.dimensions(), Some(3));

        let err = index.query(&[1.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, MicroRagError::Retrieval(_)));
        assert!(err.to_string().contains("2 dimensions"));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        let index = InMemoryVectorIndex::new();
        index.insert(entry("a.pdf", vec![0.1, 0.2]));
        index.save(&path).unwrap();

        let loaded = InMemoryVectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_snapshot_rejects_mixed_widths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        let entries = vec![entry("a", vec![0.1, 0.2]), entry("b", vec![0.1])];
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        assert!(matches!(
            InMemoryVectorIndex::load(&path),
            Err(MicroRagError::InvalidInput(_))
        ));
    }
}

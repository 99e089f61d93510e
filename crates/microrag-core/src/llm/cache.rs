//! Query embedding cache to avoid re-embedding repeated questions

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    value: Vec<f32>,
    expires_at: SystemTime,
}

/// In-memory cache of embeddings keyed by model and text
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl EmbeddingCache {
    /// One hour TTL, 1024 entries
    pub fn new() -> Self {
        Self::with_limits(Duration::from_secs(3600), 1024)
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Get cached value if exists and not expired
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if SystemTime::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Set cached value, dropping expired entries once the cache is full
    pub fn set(&self, key: String, value: Vec<f32>) {
        let expires_at = SystemTime::now() + self.ttl;

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                let now = SystemTime::now();
                entries.retain(|_, e| now < e.expires_at);
                if entries.len() >= self.max_entries {
                    entries.clear();
                }
            }
            entries.insert(key, CacheEntry { value, expires_at });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate cache key for embeddings
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    text.hash(&mut hasher);
    format!("embed:{}:{:x}", model, hasher.finish())
}

//! LLM integration
//!
//! Provides the capability traits the pipeline consumes and their HTTP
//! implementations:
//! - Embedding generation via an OpenAI-compatible embeddings endpoint
//! - Text generation via the Ollama generate API

mod cache;
mod client;
mod http_embedder;
mod traits;

pub use cache::{embedding_cache_key, EmbeddingCache};
pub use client::OllamaBackend;
pub use http_embedder::HttpEmbedder;
pub use traits::*;

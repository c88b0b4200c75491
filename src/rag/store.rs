//! Storage seam for the vector index backing retrieval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::RagError;

/// A stored chunk of the source corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    pub source: String,
    pub start_offset: usize,
    pub chunk_index: usize,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert chunks with their embeddings in one transaction.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), RagError>;

    /// Top `limit` chunks by similarity to `query_embedding`, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RagError>;

    async fn count(&self) -> Result<usize, RagError>;

    async fn get_meta(&self, key: &str) -> Result<Option<String>, RagError>;

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), RagError>;

    /// Drop every chunk and meta entry.
    async fn clear(&self) -> Result<(), RagError>;

    async fn close(&self) {}
}

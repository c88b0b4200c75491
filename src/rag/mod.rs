//! Retrieval-augmented generation over a single text corpus.
//!
//! - `TextSplitter`: cuts the corpus into overlapping chunks
//! - `SqliteRagStore`: persists chunks and embeddings, brute-force cosine search
//! - `RagPipeline`: builds or loads the index and answers queries

mod error;
mod pipeline;
mod splitter;
mod sqlite;
mod store;

pub use error::RagError;
pub use pipeline::{IndexStatus, RagPipeline};
pub use splitter::{TextChunk, TextSplitter};
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};

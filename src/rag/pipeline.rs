//! Retrieve-then-generate question answering over the corpus index.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::error::RagError;
use super::splitter::TextSplitter;
use super::sqlite::SqliteRagStore;
use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::config::RagSettings;
use crate::llm::{Embedder, HuggingFaceEmbedder, HuggingFaceLlm, LanguageModel, LlmError};

const EMBED_BATCH_SIZE: usize = 32;

pub const META_EMBEDDING_MODEL: &str = "embedding_model";
pub const META_CORPUS_SHA256: &str = "corpus_sha256";

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// What `ensure_index` did at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Loaded { chunks: usize },
    Built { chunks: usize },
}

pub struct RagPipeline {
    store: Arc<dyn RagStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    splitter: TextSplitter,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        store: Arc<dyn RagStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        splitter: TextSplitter,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            splitter,
            top_k: top_k.max(1),
        }
    }

    /// Wires the SQLite index and the hosted HuggingFace models from settings.
    pub async fn from_settings(settings: &RagSettings) -> Result<Self, RagError> {
        let store = SqliteRagStore::open_dir(&settings.index_dir).await?;
        let embedder = HuggingFaceEmbedder::from_settings(settings)?;
        let llm = HuggingFaceLlm::from_settings(settings)?;

        Ok(Self::new(
            Arc::new(store),
            Arc::new(embedder),
            Arc::new(llm),
            TextSplitter::new(settings.chunk_size, settings.chunk_overlap),
            settings.top_k,
        ))
    }

    /// Loads the persisted index, or builds it from `corpus_path` when it is
    /// empty or was embedded with a different model.
    pub async fn ensure_index(&self, corpus_path: &Path) -> Result<IndexStatus, RagError> {
        let existing = self.store.count().await?;
        let indexed_model = self.store.get_meta(META_EMBEDDING_MODEL).await?;

        if existing > 0 && indexed_model.as_deref() == Some(self.embedder.model_name()) {
            self.warn_if_corpus_changed(corpus_path).await;
            tracing::info!("Loaded vector index with {} chunks", existing);
            return Ok(IndexStatus::Loaded { chunks: existing });
        }

        if existing > 0 {
            tracing::warn!(
                "Vector index was built with {:?}, configured model is {}; rebuilding",
                indexed_model,
                self.embedder.model_name()
            );
        }

        let chunks = self.build_index(corpus_path).await?;
        Ok(IndexStatus::Built { chunks })
    }

    async fn build_index(&self, corpus_path: &Path) -> Result<usize, RagError> {
        if !corpus_path.exists() {
            return Err(RagError::CorpusMissing(corpus_path.display().to_string()));
        }

        let bytes = tokio::fs::read(corpus_path).await?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let text = String::from_utf8_lossy(&bytes);
        let source = corpus_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| corpus_path.display().to_string());

        let chunks = self.splitter.split(&text, &source);
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus(corpus_path.display().to_string()));
        }
        tracing::info!(
            "Building vector index from {} ({} chunks, model {})",
            corpus_path.display(),
            chunks.len(),
            self.embedder.model_name()
        );

        let mut items = Vec::with_capacity(chunks.len());
        for group in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = group.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != group.len() {
                return Err(LlmError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    group.len(),
                    vectors.len()
                ))
                .into());
            }

            for (chunk, vector) in group.iter().zip(vectors) {
                let stored = StoredChunk {
                    chunk_id: uuid::Uuid::new_v4().to_string(),
                    content: chunk.text.clone(),
                    source: chunk.source.clone(),
                    start_offset: chunk.start_offset,
                    chunk_index: chunk.chunk_index,
                };
                items.push((stored, vector));
            }
        }

        let total = items.len();
        self.store.clear().await?;
        self.store.insert_batch(items).await?;
        self.store
            .set_meta(META_EMBEDDING_MODEL, self.embedder.model_name())
            .await?;
        self.store.set_meta(META_CORPUS_SHA256, &digest).await?;

        tracing::info!("Persisted vector index with {} chunks", total);
        Ok(total)
    }

    async fn warn_if_corpus_changed(&self, corpus_path: &Path) {
        let Ok(bytes) = tokio::fs::read(corpus_path).await else {
            return;
        };
        let digest = hex::encode(Sha256::digest(&bytes));
        match self.store.get_meta(META_CORPUS_SHA256).await {
            Ok(Some(indexed)) if indexed != digest => tracing::warn!(
                "{} changed since the index was built; delete the index to rebuild it",
                corpus_path.display()
            ),
            Ok(_) => {}
            Err(err) => tracing::debug!("Could not read corpus digest: {}", err),
        }
    }

    /// Answers `query` from the top-k retrieved chunks. Each call is independent.
    pub async fn answer(&self, query: &str) -> Result<String, RagError> {
        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no embedding returned for query".to_string()))?;

        let hits = self.store.search(&query_embedding, self.top_k).await?;
        if hits.is_empty() {
            return Err(RagError::IndexUnavailable("index holds no chunks".to_string()));
        }

        let prompt = build_prompt(&hits, query);
        let answer = self.llm.generate(&prompt).await?;
        Ok(answer)
    }

    pub async fn chunk_count(&self) -> Result<usize, RagError> {
        self.store.count().await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

/// Stuffs every retrieved chunk into a single prompt.
fn build_prompt(hits: &[ChunkSearchResult], question: &str) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        PROMPT_PREAMBLE, context, question
    )
}

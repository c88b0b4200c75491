use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("corpus not found at {0}")]
    CorpusMissing(String),
    #[error("corpus {0} produced no chunks")]
    EmptyCorpus(String),
    #[error("index storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Model(#[from] LlmError),
}

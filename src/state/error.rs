use thiserror::Error;

use crate::rag::RagError;
use crate::users::UserStoreError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to open user store: {0}")]
    Users(#[source] UserStoreError),

    #[error("Failed to initialize RAG pipeline: {0}")]
    Rag(#[source] RagError),
}

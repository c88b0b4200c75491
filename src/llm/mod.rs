pub mod huggingface;
pub mod provider;
pub mod types;

pub use huggingface::{HuggingFaceEmbedder, HuggingFaceLlm};
pub use provider::{Embedder, LanguageModel, LlmError};
pub use types::GenerationParams;

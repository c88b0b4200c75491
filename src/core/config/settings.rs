//! Typed view of the merged configuration.
//!
//! Every field has a default so an empty `config.yml` yields a working
//! local setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub rag: RagSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC secret for access tokens. A random per-process secret is used when unset.
    pub jwt_secret: Option<String>,
    pub token_ttl_minutes: u64,
    /// Whether `/register` accepts roles other than `user`.
    pub allow_privileged_self_registration: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_minutes: 30,
            allow_privileged_self_registration: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub corpus_path: PathBuf,
    pub index_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_model: String,
    pub llm_model: String,
    pub temperature: f64,
    pub max_length: u32,
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub hf_token: Option<String>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("sample.txt"),
            index_dir: PathBuf::from("faiss_index"),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            llm_model: "google/flan-t5-base".to_string(),
            temperature: 0.5,
            max_length: 256,
            api_base: "https://api-inference.huggingface.co".to_string(),
            request_timeout_secs: 60,
            hf_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("users.db"),
        }
    }
}

impl Settings {
    /// Anchors every relative path at the data directory.
    pub fn resolve_paths(&mut self, paths: &AppPaths) {
        self.rag.corpus_path = paths.resolve(&self.rag.corpus_path);
        self.rag.index_dir = paths.resolve(&self.rag.index_dir);
        self.database.path = paths.resolve(&self.database.path);
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

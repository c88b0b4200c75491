use std::sync::Arc;

use crate::auth::TokenService;
use crate::core::config::Settings;
use crate::rag::{IndexStatus, RagPipeline};
use crate::users::{SqliteUserStore, UserStore};

pub mod error;

use error::InitializationError;

/// Shared handles passed to every request handler.
///
/// Everything here is built once at startup and only read afterwards:
/// - settings resolved from config files and the environment
/// - the user repository (pooled SQLite connections)
/// - the token signer/verifier
/// - the RAG pipeline with its loaded index
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub rag: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        users: Arc<dyn UserStore>,
        tokens: TokenService,
        rag: Arc<RagPipeline>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings: Arc::new(settings),
            users,
            tokens,
            rag,
        })
    }

    /// Opens the user database, then loads or builds the vector index.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let users = SqliteUserStore::new(&settings.database.path)
            .await
            .map_err(InitializationError::Users)?;
        match users.count().await {
            Ok(count) => tracing::info!(
                "User store ready at {} ({} users)",
                settings.database.path.display(),
                count
            ),
            Err(err) => tracing::warn!("Failed to count users: {}", err),
        }

        let tokens = TokenService::from_settings(&settings.auth);
        if settings.auth.allow_privileged_self_registration {
            tracing::warn!(
                "auth.allow_privileged_self_registration is enabled; anyone can register as admin or auditor"
            );
        }

        let rag = RagPipeline::from_settings(&settings.rag)
            .await
            .map_err(InitializationError::Rag)?;
        let status = rag
            .ensure_index(&settings.rag.corpus_path)
            .await
            .map_err(InitializationError::Rag)?;
        if let IndexStatus::Built { chunks } = status {
            tracing::info!(
                "Indexed {} into {} ({} chunks)",
                settings.rag.corpus_path.display(),
                settings.rag.index_dir.display(),
                chunks
            );
        }

        Ok(Self::new(settings, Arc::new(users), tokens, Arc::new(rag)))
    }

    pub async fn shutdown(&self) {
        self.users.close().await;
        self.rag.close().await;
    }
}

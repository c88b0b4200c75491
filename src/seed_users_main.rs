//! Creates the sample accounts (one per role) in the configured user database.

use std::sync::Arc;

use anyhow::Context;

use rag_auth_backend::auth::hash_password;
use rag_auth_backend::core::config::{AppPaths, ConfigService};
use rag_auth_backend::core::logging;
use rag_auth_backend::users::{Role, SqliteUserStore, UserStore, UserStoreError};

const SAMPLE_USERS: [(&str, &str, Role); 3] = [
    ("admin1", "adminpass", Role::Admin),
    ("user1", "userpass", Role::User),
    ("auditor1", "auditpass", Role::Auditor),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "seed_users.log");

    let settings = ConfigService::new(paths)
        .load_settings()
        .context("Failed to load configuration")?;
    let store = SqliteUserStore::new(&settings.database.path)
        .await
        .context("Failed to open user database")?;

    for (username, password, role) in SAMPLE_USERS {
        let hashed = hash_password(password)?;
        match store.create(username, &hashed, role).await {
            Ok(user) => tracing::info!("Created {} ({})", user.username, user.role),
            Err(UserStoreError::Duplicate(name)) => {
                tracing::info!("{} already exists, skipping", name)
            }
            Err(err) => return Err(err).context(format!("Failed to create {}", username)),
        }
    }

    store.close().await;
    tracing::info!("Sample users created in {}", settings.database.path.display());
    Ok(())
}

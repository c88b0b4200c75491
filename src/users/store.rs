use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use super::models::{Role, User};

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("username already registered: {0}")]
    Duplicate(String),
    #[error("stored role is not recognised: {0}")]
    InvalidRole(String),
    #[error("user database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Data access for user identities. Handlers only ever see these operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError>;

    /// Fails with [`UserStoreError::Duplicate`] when `username` is taken.
    async fn create(
        &self,
        username: &str,
        hashed_password: &str,
        role: Role,
    ) -> Result<User, UserStoreError>;

    async fn count(&self) -> Result<usize, UserStoreError>;

    async fn close(&self) {}
}

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub async fn new(db_path: &Path) -> Result<Self, UserStoreError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), UserStoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                role TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, UserStoreError> {
        let role_text: String = row.try_get("role")?;
        let role = role_text
            .parse::<Role>()
            .map_err(UserStoreError::InvalidRole)?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password: row.try_get("password")?,
            role,
        })
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        let row = sqlx::query("SELECT id, username, password, role FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn create(
        &self,
        username: &str,
        hashed_password: &str,
        role: Role,
    ) -> Result<User, UserStoreError> {
        let result = sqlx::query("INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3)")
            .bind(username)
            .bind(hashed_password)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let unique_violation = err
                    .as_database_error()
                    .map(|db_err| db_err.is_unique_violation())
                    .unwrap_or(false);
                if unique_violation {
                    UserStoreError::Duplicate(username.to_string())
                } else {
                    UserStoreError::Database(err)
                }
            })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password: hashed_password.to_string(),
            role,
        })
    }

    async fn count(&self) -> Result<usize, UserStoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteUserStore {
        let tmp = std::env::temp_dir().join(format!("rag-auth-users-{}.db", uuid::Uuid::new_v4()));
        SqliteUserStore::new(&tmp).await.unwrap()
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = test_store().await;

        let created = store.create("alice", "$argon2id$hash", Role::Auditor).await.unwrap();
        let found = store.find_by_username("alice").await.unwrap().unwrap();

        assert_eq!(found, created);
        assert_eq!(found.role, Role::Auditor);
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_and_count_moves_once() {
        let store = test_store().await;
        assert_eq!(store.count().await.unwrap(), 0);

        store.create("alice", "h1", Role::User).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let second = store.create("alice", "h2", Role::Admin).await;
        assert!(matches!(second, Err(UserStoreError::Duplicate(name)) if name == "alice"));
        assert_eq!(store.count().await.unwrap(), 1);

        let kept = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(kept.password, "h1");
        assert_eq!(kept.role, Role::User);
    }

    #[tokio::test]
    async fn unknown_role_in_table_is_reported() {
        let store = test_store().await;
        sqlx::query("INSERT INTO users (username, password, role) VALUES ('eve', 'h', 'root')")
            .execute(&store.pool)
            .await
            .unwrap();

        let result = store.find_by_username("eve").await;

        assert!(matches!(result, Err(UserStoreError::InvalidRole(role)) if role == "root"));
    }
}

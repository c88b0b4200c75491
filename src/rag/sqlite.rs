//! SQLite-backed vector index.
//!
//! One row per chunk, with its embedding stored as a little-endian f32 blob.
//! Search loads every vector and ranks by cosine similarity, which is plenty
//! for a single-document corpus.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use super::error::RagError;
use super::store::{ChunkSearchResult, RagStore, StoredChunk};

pub const INDEX_FILE_NAME: &str = "index.db";

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        source TEXT NOT NULL,
        char_offset INTEGER NOT NULL,
        position INTEGER NOT NULL,
        vector BLOB NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS rag_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
];

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteRagStore {
    /// Opens (or creates) `index.db` inside `index_dir`.
    pub async fn open_dir(index_dir: &Path) -> Result<Self, RagError> {
        std::fs::create_dir_all(index_dir)?;
        Self::with_path(index_dir.join(INDEX_FILE_NAME)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn chunk_from_row(row: &SqliteRow) -> Result<StoredChunk, sqlx::Error> {
    let char_offset: i64 = row.try_get("char_offset")?;
    let position: i64 = row.try_get("position")?;
    Ok(StoredChunk {
        chunk_id: row.try_get("id")?,
        content: row.try_get("text")?,
        source: row.try_get("source")?,
        start_offset: usize::try_from(char_offset).unwrap_or_default(),
        chunk_index: usize::try_from(position).unwrap_or_default(),
    })
}

/// Zero for mismatched lengths or a zero-norm side.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), RagError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (chunk, vector) in items {
            sqlx::query(
                "INSERT OR REPLACE INTO chunks (id, text, source, char_offset, position, vector)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(chunk.chunk_id)
            .bind(chunk.content)
            .bind(chunk.source)
            .bind(chunk.start_offset as i64)
            .bind(chunk.chunk_index as i64)
            .bind(vector_to_blob(&vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RagError> {
        let rows = sqlx::query("SELECT id, text, source, char_offset, position, vector FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.try_get("vector")?;
            let score = cosine_similarity(query_embedding, &blob_to_vector(&blob));
            results.push(ChunkSearchResult {
                chunk: chunk_from_row(row)?,
                score,
            });
        }

        results.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit.max(1));
        Ok(results)
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>, RagError> {
        Ok(sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), RagError> {
        sqlx::query(
            "INSERT INTO rag_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), RagError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM rag_meta").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

//! SQLite backend for the document store.
//!
//! A single `pokemon_cache` table serves both logical uses of the store:
//! entity payloads keyed by name, and the full serialized index under its
//! reserved sentinel key.

use super::error::StoreError;
use super::{StoreBackend, StoredRecord};
use crate::common;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

#[derive(sqlx::FromRow)]
struct DocumentRow {
    payload: String,
    updated_at: i64,
}

impl DocumentRow {
    fn extract(self) -> Result<StoredRecord, StoreError> {
        let payload = serde_json::from_str(&self.payload)?;
        Ok(StoredRecord {
            payload,
            updated_at: self.updated_at,
        })
    }
}

/// SQLite-based document store.
///
/// WAL mode keeps concurrent readers cheap; writes go through a single upsert
/// statement so the last writer always wins.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Connects to `url` (e.g. `sqlite://dex.db?mode=rwc` or `sqlite::memory:`)
    /// and creates the cache table if it does not exist yet.
    pub async fn from_url(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(url).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query(
            r#"
                CREATE TABLE IF NOT EXISTS pokemon_cache (
                    name TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl StoreBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT payload, updated_at FROM pokemon_cache WHERE name = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::extract).transpose()
    }

    async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(payload)?;
        sqlx::query(
            r#"
                INSERT INTO pokemon_cache (name, payload, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT (name) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(payload_json)
        .bind(common::unix_seconds())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

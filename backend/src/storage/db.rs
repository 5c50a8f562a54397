use async_trait::async_trait;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::StorageError;
use super::traits::{entry_size, KeyValueStore};

/// The database URL for the production namespace
pub const DEFAULT_DATABASE_URL: &str = "sqlite:health_tracker.db";

/// SQLite-backed key-value namespace.
///
/// All tracker state lives in a single `key_values` table. An optional
/// capacity (in characters of key plus value, the same unit the storage
/// manager accounts in) makes oversized writes fail with
/// [`StorageError::QuotaExceeded`], the way a browser's storage refuses writes
/// once its platform quota is reached.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
    capacity_bytes: Option<usize>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url`
    pub async fn connect(url: &str, capacity_bytes: Option<usize>) -> Result<Self, StorageError> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("🗄️ Creating key-value database at {}", url);
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
            capacity_bytes,
        })
    }

    /// In-memory namespace. A single pooled connection keeps the database alive
    /// for as long as the store exists.
    pub async fn in_memory(capacity_bytes: Option<usize>) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
            capacity_bytes,
        })
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_values (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Total characters currently stored, keys included
    async fn stored_size(&self) -> Result<usize, StorageError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM key_values",
        )
        .fetch_one(&*self.pool)
        .await?;
        Ok(total.max(0) as usize)
    }

    /// Reject a write that would take the namespace past its capacity
    async fn check_capacity(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let Some(capacity) = self.capacity_bytes else {
            return Ok(());
        };

        let current = self.stored_size().await?;
        let replaced = self
            .get(key)
            .await?
            .map(|old| entry_size(key, &old))
            .unwrap_or(0);
        let projected = current - replaced.min(current) + entry_size(key, value);

        if projected > capacity {
            warn!(
                "💾 Write of '{}' refused: projected {} > capacity {}",
                key, projected, capacity
            );
            return Err(StorageError::QuotaExceeded { key: key.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM key_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_capacity(key, value).await?;

        sqlx::query("INSERT OR REPLACE INTO key_values (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&*self.pool)
            .await?;
        debug!("Stored '{}' ({} characters)", key, value.chars().count());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM key_values WHERE key = ?")
            .bind(key)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
        let rows = sqlx::query("SELECT key, value FROM key_values")
            .fetch_all(&*self.pool)
            .await?;

        rows.iter()
            .map(|row| Ok((row.try_get("key")?, row.try_get("value")?)))
            .collect()
    }
}

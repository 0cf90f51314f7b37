//! SQLite storage backend
//!
//! One table holds every entry:
//!
//! ```sql
//! CREATE TABLE dbroles_entries (key TEXT PRIMARY KEY, value BLOB NOT NULL)
//! ```

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::{children_of, Storage, StorageEntry};
use crate::error::Result;

/// SQLite implementation of [`Storage`]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and make sure the schema exists
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create the entries table if it does not exist
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dbroles_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("SQLite role storage schema initialized");
        Ok(())
    }
}

/// Escape LIKE wildcards so the prefix matches literally
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>> {
        let row = sqlx::query("SELECT value FROM dbroles_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| StorageEntry::new(key, row.get::<Vec<u8>, _>("value"))))
    }

    async fn put(&self, entry: StorageEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO dbroles_entries (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .execute(&self.pool)
        .await?;

        debug!(key = %entry.key, bytes = entry.value.len(), "Stored entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM dbroles_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT key FROM dbroles_entries WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(like_prefix(prefix))
        .fetch_all(&self.pool)
        .await?;

        let keys: Vec<String> = rows.iter().map(|row| row.get("key")).collect();
        Ok(children_of(prefix, keys.iter().map(String::as_str)))
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

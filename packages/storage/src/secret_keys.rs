// ABOUTME: Secret key storage using SQLite
// ABOUTME: Named, write-once key rows with atomic create-if-absent semantics

use sqlx::SqlitePool;
use tracing::debug;

use crate::StorageResult;

/// Row store for process-wide secret keys.
///
/// Rows are written once and never updated; callers race on
/// [`SecretKeyStorage::insert_if_absent`] and re-read to adopt the winner.
#[derive(Clone)]
pub struct SecretKeyStorage {
    pool: SqlitePool,
}

impl SecretKeyStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the raw key bytes stored under `name`
    pub async fn get(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let key_bytes: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT key_bytes FROM secret_keys WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(key_bytes)
    }

    /// Store `key_bytes` under `name` unless a row already exists.
    ///
    /// Returns `true` when this call created the row.
    pub async fn insert_if_absent(&self, name: &str, key_bytes: &[u8]) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO secret_keys (name, key_bytes)
            VALUES (?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(key_bytes)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        debug!(name = %name, created, "Secret key insert attempted");

        Ok(created)
    }
}

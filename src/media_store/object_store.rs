/// Key/value object-store backend
use crate::{
    capability::BackendKind,
    db,
    error::{MediaError, MediaResult},
    keys::{prefix_segments, StorageKey},
    media_store::MediaBackend,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Object-store backend
///
/// One flat table keyed by the full storage key. The table has no notion of
/// hierarchy, so deleting by prefix scans every key and deletes matches one
/// at a time. That is O(total stored keys) with no index, which is fine for
/// a single user's attachments and will need a prefix index if volume grows.
#[derive(Clone)]
pub struct ObjectStoreBackend {
    db: SqlitePool,
}

impl ObjectStoreBackend {
    /// Open (creating if needed) the object table at `path`
    pub async fn open(path: &Path) -> MediaResult<Self> {
        info!("Opening media object store at {}", path.display());
        let db = db::create_pool(path, db::DatabaseOptions::default()).await?;
        Self::with_pool(db).await
    }

    /// Object store held entirely in memory
    pub async fn open_in_memory() -> MediaResult<Self> {
        let db = db::create_memory_pool().await?;
        Self::with_pool(db).await
    }

    /// Wrap an existing pool, creating the table if it is missing
    pub async fn with_pool(db: SqlitePool) -> MediaResult<Self> {
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;
        Ok(Self { db })
    }

    /// Every key in the table
    async fn scan_keys(&self, prefix: &str) -> MediaResult<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM media_objects")
            .fetch_all(&self.db)
            .await
            .map_err(|e| MediaError::database(prefix, e))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MediaError::database(prefix, e))
    }
}

#[async_trait]
impl MediaBackend for ObjectStoreBackend {
    fn kind(&self) -> Option<BackendKind> {
        Some(BackendKind::ObjectStore)
    }

    async fn write(&self, key: &StorageKey, bytes: &[u8]) -> MediaResult<()> {
        sqlx::query(
            r#"
            INSERT INTO media_objects (key, bytes, stored_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                bytes = excluded.bytes,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(key.as_str())
        .bind(bytes)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(|e| MediaError::database(key.as_str(), e))?;

        debug!(key = %key, size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn read(&self, key: &StorageKey) -> MediaResult<Vec<u8>> {
        let row = sqlx::query("SELECT bytes FROM media_objects WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.db)
            .await
            .map_err(|e| MediaError::database(key.as_str(), e))?;

        match row {
            Some(row) => row
                .try_get::<Vec<u8>, _>("bytes")
                .map_err(|e| MediaError::database(key.as_str(), e)),
            None => Err(MediaError::NotFound(key.to_string())),
        }
    }

    async fn delete(&self, key: &StorageKey) -> MediaResult<()> {
        sqlx::query("DELETE FROM media_objects WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.db)
            .await
            .map_err(|e| MediaError::database(key.as_str(), e))?;

        debug!(key = %key, "Deleted object");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> MediaResult<()> {
        let directory = format!("{}/", prefix_segments(prefix)?.join("/"));

        let matching: Vec<String> = self
            .scan_keys(prefix)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&directory))
            .collect();

        for key in &matching {
            sqlx::query("DELETE FROM media_objects WHERE key = ?1")
                .bind(key.as_str())
                .execute(&self.db)
                .await
                .map_err(|e| MediaError::database(key.as_str(), e))?;
        }

        info!(prefix, deleted = matching.len(), "Deleted objects by prefix");
        Ok(())
    }
}

/// Database layer for the object-store backend
///
/// Manages the SQLite pool and the embedded migrations that create the
/// flat `media_objects` table.
use crate::error::{MediaError, MediaResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const POOL_KEY: &str = "<pool>";

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool backed by a file
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> MediaResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MediaError::io(parent.to_string_lossy(), e))?;
    }

    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(if options.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        })
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| MediaError::database(path.to_string_lossy(), e))
}

/// Create a private in-memory pool
///
/// A single connection that is never recycled, since every SQLite
/// in-memory connection is its own database.
pub async fn create_memory_pool() -> MediaResult<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| MediaError::database(POOL_KEY, e))?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(connect_options)
        .await
        .map_err(|e| MediaError::database(POOL_KEY, e))
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> MediaResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| MediaError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> MediaResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| MediaError::database(POOL_KEY, e))?;

    Ok(())
}

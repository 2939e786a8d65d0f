// ABOUTME: Data layer and persistence for CTC projects
// ABOUTME: SQLite pool bootstrap, embedded migrations, and the secret key table

pub mod secret_keys;

use std::path::PathBuf;
use std::time::Duration;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;
use tracing::{debug, info};

pub use secret_keys::SecretKeyStorage;
pub use sqlx::{Error as SqlxError, SqlitePool};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub enable_wal: bool,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: ctc_core::database_file(),
            enable_wal: true,
            max_connections: 5,
            busy_timeout_seconds: 30,
        }
    }
}

impl StorageConfig {
    pub fn at(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }
}

/// Open (creating if needed) the SQLite database and run embedded migrations
pub async fn open_pool(config: &StorageConfig) -> StorageResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let database_url = format!("sqlite:{}", config.database_path.display());

    // Create database if it doesn't exist
    if !sqlx::Sqlite::database_exists(&database_url).await? {
        debug!("Creating database at: {}", database_url);
        sqlx::Sqlite::create_database(&database_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.busy_timeout_seconds))
        .connect(&database_url)
        .await?;

    if config.enable_wal {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
    }

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!(
        database = %config.database_path.display(),
        "Storage initialized"
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Single-connection in-memory database with migrations applied
///
/// One connection only: every SQLite `:memory:` connection is its own database.
#[cfg(any(test, feature = "test-utils"))]
pub async fn open_in_memory_pool() -> StorageResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

//! Cadence Storage
//!
//! `SQLite` library store for Cadence: songs, playlists and playlist entries.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: `tracks` and `playlists` each own their queries
//! - **Ordered Playlists**: entry positions stay zero-based and gap-free;
//!   every insert/remove shifts its neighbours inside one transaction
//! - **Change Feed**: every committed mutation is published to
//!   `LibraryStore::subscribe()` subscribers
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::{SqliteLibrary, create_pool, run_migrations};
//! use cadence_core::LibraryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://cadence.db").await?;
//! run_migrations(&pool).await?;
//!
//! let library = SqliteLibrary::new(pool);
//! let previews = library.playlist_previews().await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod playlists;
pub mod tracks;

pub use context::SqliteLibrary;
pub use error::{Result, StorageError};

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at startup, before building a `SqliteLibrary`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `sqlite://cadence.db`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!(url = %database_url, "SQLite pool created");
    Ok(pool)
}

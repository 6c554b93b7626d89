//! Cadence Storage
//!
//! `SQLite` persistence for the Cadence catalog, queue window, play
//! statistics, and audit history.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each table owns its own queries (`tracks`, `queue`,
//!   `statistics`, `history`)
//! - **Atomic Writes**: Window replacement and statistics increments run in
//!   a single transaction, so other connections never see a partial window
//! - **Embedded Migrations**: Schema ships inside the binary
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::CatalogStore;
//! use cadence_storage::{create_pool, run_migrations, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://cadence.db").await?;
//! run_migrations(&pool).await?;
//!
//! let store = SqliteStore::new(pool);
//! let tracks = store.get_all_tracks().await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod history;
pub mod queue;
pub mod statistics;
pub mod tracks;

pub use context::SqliteStore;
pub use error::StorageError;

use cadence_core::{CoreError, Result};
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at start-up, before building a [`SqliteStore`].
pub async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), StorageError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `sqlite://cadence.db`)
pub async fn create_pool(database_url: &str) -> std::result::Result<SqlitePool, StorageError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    debug!("SQLite pool ready");

    Ok(pool)
}

/// Timestamps are stored as Unix milliseconds
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| CoreError::storage(format!("timestamp out of range: {ms}")))
}

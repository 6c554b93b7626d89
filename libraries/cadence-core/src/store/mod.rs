//! Persisted-store traits
//!
//! The queue engine and the statistics ledger depend only on these traits.
//! Implementations must make `replace_window` and `increment` atomic: readers
//! must never see an empty or half-written window.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{
    CatalogSummary, HistoryEntry, QueueWindow, Track, TrackId, TrackStatistics,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Catalog of known tracks
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or update tracks, keeping first-insertion order for new ones
    async fn upsert_tracks(&self, tracks: &[Track]) -> Result<()>;

    /// Get track by ID
    async fn get_track(&self, id: &TrackId) -> Result<Option<Track>>;

    /// Get tracks by ID (unknown IDs are skipped, order unspecified)
    async fn get_tracks(&self, ids: &[TrackId]) -> Result<Vec<Track>>;

    /// Get all tracks in catalog order
    async fn get_all_tracks(&self) -> Result<Vec<Track>>;

    /// Tracks whose title, artist, or album contains `query`
    ///
    /// Matching ignores ASCII case and treats `%` and `_` literally. Results
    /// are ordered by title, then catalog order.
    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>>;

    /// Track count, total duration, and distinct artists
    async fn catalog_summary(&self) -> Result<CatalogSummary>;
}

/// Persisted queue window
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Load the persisted window (empty if none)
    async fn load_window(&self) -> Result<QueueWindow>;

    /// Replace the whole window in one transaction
    async fn replace_window(&self, window: &QueueWindow) -> Result<()>;
}

/// Per-track play statistics
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Create zero-count rows for tracks that have none
    ///
    /// Returns the number of rows created.
    async fn seed_statistics(&self, ids: &[TrackId]) -> Result<usize>;

    /// Atomically add `delta` to each known track and stamp its activity time
    ///
    /// Unknown tracks are ignored.
    async fn increment(&self, ids: &[TrackId], delta: u64, at: DateTime<Utc>) -> Result<()>;

    /// Least-played track IDs
    ///
    /// Ordered by play count, then last activity (never-played first), then
    /// insertion order. IDs in `exclude` are never returned.
    async fn least_played(&self, limit: usize, exclude: &HashSet<TrackId>)
        -> Result<Vec<TrackId>>;

    /// Current play counts for the given tracks (unknown IDs are absent)
    async fn play_counts(&self, ids: &[TrackId]) -> Result<HashMap<TrackId, u64>>;

    /// Statistics for one track
    async fn get_statistics(&self, id: &TrackId) -> Result<Option<TrackStatistics>>;

    /// All statistics rows in insertion order
    async fn all_statistics(&self) -> Result<Vec<TrackStatistics>>;
}

/// Append-only audit log of plays and skips
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()>;

    /// Drop everything except the `keep` newest entries
    async fn trim_history(&self, keep: usize) -> Result<()>;

    /// Newest entries first
    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>>;

    async fn clear_history(&self) -> Result<()>;
}

/// Everything the playback layer needs from a store
pub trait PlaybackStore: CatalogStore + QueueStore + StatisticsStore + HistoryStore {}

impl<T> PlaybackStore for T where T: CatalogStore + QueueStore + StatisticsStore + HistoryStore {}

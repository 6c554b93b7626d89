use crate::{history, queue, statistics, tracks};
use async_trait::async_trait;
use cadence_core::store::{CatalogStore, HistoryStore, QueueStore, StatisticsStore};
use cadence_core::{
    CatalogSummary, HistoryEntry, QueueWindow, Result, Track, TrackId, TrackStatistics,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

/// Store backed by a `SQLite` pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn upsert_tracks(&self, tracks: &[Track]) -> Result<()> {
        tracks::upsert_many(&self.pool, tracks).await
    }

    async fn get_track(&self, id: &TrackId) -> Result<Option<Track>> {
        tracks::get_by_id(&self.pool, id).await
    }

    async fn get_tracks(&self, ids: &[TrackId]) -> Result<Vec<Track>> {
        tracks::get_by_ids(&self.pool, ids).await
    }

    async fn get_all_tracks(&self) -> Result<Vec<Track>> {
        tracks::get_all(&self.pool).await
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        tracks::search(&self.pool, query).await
    }

    async fn catalog_summary(&self) -> Result<CatalogSummary> {
        tracks::summary(&self.pool).await
    }
}

#[async_trait]
impl QueueStore for SqliteStore {
    async fn load_window(&self) -> Result<QueueWindow> {
        queue::load(&self.pool).await
    }

    async fn replace_window(&self, window: &QueueWindow) -> Result<()> {
        queue::replace(&self.pool, window).await
    }
}

#[async_trait]
impl StatisticsStore for SqliteStore {
    async fn seed_statistics(&self, ids: &[TrackId]) -> Result<usize> {
        statistics::seed(&self.pool, ids).await
    }

    async fn increment(&self, ids: &[TrackId], delta: u64, at: DateTime<Utc>) -> Result<()> {
        statistics::increment(&self.pool, ids, delta, at).await
    }

    async fn least_played(
        &self,
        limit: usize,
        exclude: &HashSet<TrackId>,
    ) -> Result<Vec<TrackId>> {
        statistics::least_played(&self.pool, limit, exclude).await
    }

    async fn play_counts(&self, ids: &[TrackId]) -> Result<HashMap<TrackId, u64>> {
        statistics::play_counts(&self.pool, ids).await
    }

    async fn get_statistics(&self, id: &TrackId) -> Result<Option<TrackStatistics>> {
        statistics::get(&self.pool, id).await
    }

    async fn all_statistics(&self) -> Result<Vec<TrackStatistics>> {
        statistics::get_all(&self.pool).await
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        history::append(&self.pool, entry).await
    }

    async fn trim_history(&self, keep: usize) -> Result<()> {
        history::trim_to(&self.pool, keep).await
    }

    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        history::recent(&self.pool, limit).await
    }

    async fn clear_history(&self) -> Result<()> {
        history::clear(&self.pool).await
    }
}

//! In-memory store
//!
//! Implements every store trait over plain collections behind a mutex.
//! Used by tests and by embedders that do not need durability.

use super::{CatalogStore, HistoryStore, QueueStore, StatisticsStore};
use crate::error::{CoreError, Result};
use crate::types::{
    CatalogSummary, HistoryEntry, QueueWindow, Track, TrackId, TrackStatistics,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    tracks: Vec<Track>,
    track_index: HashMap<TrackId, usize>,
    window: QueueWindow,
    stats: Vec<TrackStatistics>,
    stats_index: HashMap<TrackId, usize>,
    /// Oldest first
    history: Vec<HistoryEntry>,
}

/// In-memory implementation of the store traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a storage error
    ///
    /// Lets callers exercise their best-effort paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::storage("memory store unavailable"));
        }
        self.inner
            .lock()
            .map_err(|_| CoreError::storage("memory store lock poisoned"))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert_tracks(&self, tracks: &[Track]) -> Result<()> {
        let mut inner = self.lock()?;
        for track in tracks {
            if let Some(&idx) = inner.track_index.get(&track.id) {
                inner.tracks[idx] = track.clone();
            } else {
                let idx = inner.tracks.len();
                inner.track_index.insert(track.id.clone(), idx);
                inner.tracks.push(track.clone());
            }
        }
        Ok(())
    }

    async fn get_track(&self, id: &TrackId) -> Result<Option<Track>> {
        let inner = self.lock()?;
        Ok(inner.track_index.get(id).map(|&idx| inner.tracks[idx].clone()))
    }

    async fn get_tracks(&self, ids: &[TrackId]) -> Result<Vec<Track>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.track_index.get(id))
            .map(|&idx| inner.tracks[idx].clone())
            .collect())
    }

    async fn get_all_tracks(&self) -> Result<Vec<Track>> {
        Ok(self.lock()?.tracks.clone())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        let needle = query.to_ascii_lowercase();
        let inner = self.lock()?;

        let mut found: Vec<Track> = inner
            .tracks
            .iter()
            .filter(|t| {
                [&t.title, &t.artist, &t.album]
                    .iter()
                    .any(|field| field.to_ascii_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(found)
    }

    async fn catalog_summary(&self) -> Result<CatalogSummary> {
        Ok(CatalogSummary::from_tracks(&self.lock()?.tracks))
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn load_window(&self) -> Result<QueueWindow> {
        Ok(self.lock()?.window.clone())
    }

    async fn replace_window(&self, window: &QueueWindow) -> Result<()> {
        self.lock()?.window = window.clone();
        Ok(())
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn seed_statistics(&self, ids: &[TrackId]) -> Result<usize> {
        let mut inner = self.lock()?;
        let mut created = 0;
        for id in ids {
            if inner.stats_index.contains_key(id) {
                continue;
            }
            let idx = inner.stats.len();
            inner.stats_index.insert(id.clone(), idx);
            inner.stats.push(TrackStatistics::new(id.clone()));
            created += 1;
        }
        Ok(created)
    }

    async fn increment(&self, ids: &[TrackId], delta: u64, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.lock()?;
        for id in ids {
            if let Some(&idx) = inner.stats_index.get(id) {
                let row = &mut inner.stats[idx];
                row.play_count = row.play_count.saturating_add(delta);
                row.last_activity_at = Some(at);
            }
        }
        Ok(())
    }

    async fn least_played(
        &self,
        limit: usize,
        exclude: &HashSet<TrackId>,
    ) -> Result<Vec<TrackId>> {
        let inner = self.lock()?;
        let mut candidates: Vec<&TrackStatistics> = inner
            .stats
            .iter()
            .filter(|s| !exclude.contains(&s.track_id))
            .collect();

        // Stable sort keeps insertion order for full ties; None sorts before Some
        candidates.sort_by(|a, b| {
            a.play_count
                .cmp(&b.play_count)
                .then_with(|| a.last_activity_at.cmp(&b.last_activity_at))
        });

        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|s| s.track_id.clone())
            .collect())
    }

    async fn play_counts(&self, ids: &[TrackId]) -> Result<HashMap<TrackId, u64>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                inner
                    .stats_index
                    .get(id)
                    .map(|&idx| (id.clone(), inner.stats[idx].play_count))
            })
            .collect())
    }

    async fn get_statistics(&self, id: &TrackId) -> Result<Option<TrackStatistics>> {
        let inner = self.lock()?;
        Ok(inner.stats_index.get(id).map(|&idx| inner.stats[idx].clone()))
    }

    async fn all_statistics(&self) -> Result<Vec<TrackStatistics>> {
        Ok(self.lock()?.stats.clone())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.lock()?.history.push(entry.clone());
        Ok(())
    }

    async fn trim_history(&self, keep: usize) -> Result<()> {
        let mut inner = self.lock()?;
        let len = inner.history.len();
        if len > keep {
            inner.history.drain(..len - keep);
        }
        Ok(())
    }

    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let inner = self.lock()?;
        Ok(inner.history.iter().rev().take(limit).cloned().collect())
    }

    async fn clear_history(&self) -> Result<()> {
        self.lock()?.history.clear();
        Ok(())
    }
}

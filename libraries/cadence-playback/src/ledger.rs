//! Statistics ledger
//!
//! Best-effort bookkeeping over the statistics and history stores. Store
//! failures are logged and swallowed so they never block playback; reads
//! degrade to empty results.

use cadence_core::{
    HistoryEntry, HistoryStore, StatisticsStore, StatisticsSummary, TrackId, TrackStatistics,
    HISTORY_LOG_LIMIT,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Weight of an ordinary play
pub const PLAY_WEIGHT: u64 = 1;

/// Weight of a track passed over entirely (twice a play)
pub const SKIP_WEIGHT: u64 = 2;

/// Extra weight for abandoning the current track before halfway
pub const PARTIAL_PLAY_WEIGHT: u64 = 1;

/// Play-count ledger
pub struct StatisticsLedger<S> {
    store: Arc<S>,
    history_limit: usize,
}

impl<S> StatisticsLedger<S>
where
    S: StatisticsStore + HistoryStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            history_limit: HISTORY_LOG_LIMIT,
        }
    }

    /// Override how many audit-log entries are retained
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Create zero-count rows for tracks seen for the first time
    pub async fn seed(&self, ids: &[TrackId]) -> usize {
        match self.store.seed_statistics(ids).await {
            Ok(created) => {
                if created > 0 {
                    debug!(created, "Seeded track statistics");
                }
                created
            }
            Err(e) => {
                warn!(error = %e, "Failed to seed track statistics");
                0
            }
        }
    }

    /// Count a completed play start and log it
    pub async fn record_play(&self, id: &TrackId, now: DateTime<Utc>) {
        self.increment_by(std::slice::from_ref(id), PLAY_WEIGHT, now)
            .await;
        self.log(HistoryEntry::played(id.clone(), now)).await;
    }

    /// Fixed skip penalty for a single track
    pub async fn record_skip(&self, id: &TrackId, now: DateTime<Utc>) {
        self.record_skips(std::slice::from_ref(id), now).await;
    }

    /// Fixed skip penalty for several tracks
    pub async fn record_skips(&self, ids: &[TrackId], now: DateTime<Utc>) {
        if ids.is_empty() {
            return;
        }
        self.increment_by(ids, SKIP_WEIGHT, now).await;
        for id in ids {
            self.log(HistoryEntry::skipped(id.clone(), now, None)).await;
        }
    }

    /// Add `delta` to each track's play count
    ///
    /// Unknown tracks are ignored by the store.
    pub async fn increment_by(&self, ids: &[TrackId], delta: u64, now: DateTime<Utc>) {
        if ids.is_empty() || delta == 0 {
            return;
        }
        if let Err(e) = self.store.increment(ids, delta, now).await {
            warn!(error = %e, tracks = ids.len(), delta, "Failed to update play counts");
        }
    }

    /// Append a skip entry to the audit log without touching counts
    pub async fn log_skip(&self, id: &TrackId, now: DateTime<Utc>, position_ms: Option<u64>) {
        self.log(HistoryEntry::skipped(id.clone(), now, position_ms))
            .await;
    }

    async fn log(&self, entry: HistoryEntry) {
        if let Err(e) = self.store.append_history(&entry).await {
            warn!(error = %e, track_id = %entry.track_id, "Failed to append history");
            return;
        }
        if let Err(e) = self.store.trim_history(self.history_limit).await {
            warn!(error = %e, "Failed to trim history");
        }
    }

    /// Least-played track IDs outside `exclude`
    pub async fn least_played(&self, limit: usize, exclude: &HashSet<TrackId>) -> Vec<TrackId> {
        if limit == 0 {
            return Vec::new();
        }
        self.store
            .least_played(limit, exclude)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to query least-played tracks");
                Vec::new()
            })
    }

    /// Live play counts (missing tracks are absent)
    pub async fn play_counts(&self, ids: &[TrackId]) -> HashMap<TrackId, u64> {
        self.store.play_counts(ids).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read play counts");
            HashMap::new()
        })
    }

    pub async fn statistics(&self, id: &TrackId) -> Option<TrackStatistics> {
        self.store.get_statistics(id).await.unwrap_or_else(|e| {
            warn!(error = %e, track_id = %id, "Failed to read track statistics");
            None
        })
    }

    pub async fn summary(&self) -> StatisticsSummary {
        match self.store.all_statistics().await {
            Ok(rows) => StatisticsSummary::from_rows(&rows),
            Err(e) => {
                warn!(error = %e, "Failed to read statistics");
                StatisticsSummary::default()
            }
        }
    }

    /// Audit log, newest first
    pub async fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.store.recent_history(limit).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read history");
            Vec::new()
        })
    }

    pub async fn clear_history(&self) {
        if let Err(e) = self.store.clear_history().await {
            warn!(error = %e, "Failed to clear history");
        }
    }
}

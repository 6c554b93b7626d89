//! Queue window engine
//!
//! Holds the position-indexed window as an immutable snapshot. Writers are
//! serialized through [`QueueTransaction`]: it takes the single-writer lock,
//! stages a replacement window and swaps it in on [`QueueTransaction::commit`].
//! Dropping an uncommitted transaction leaves the window untouched.

use crate::error::{PlaybackError, Result};
use crate::ledger::StatisticsLedger;
use crate::shuffle::select_tracks;
use crate::types::{QueueConfig, SnapshotEntry};
use cadence_core::{PlaybackStore, QueueSlot, QueueWindow, Track, TrackId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Queue window manager
pub struct QueueEngine<S> {
    store: Arc<S>,
    ledger: Arc<StatisticsLedger<S>>,
    config: QueueConfig,
    window: Arc<RwLock<Arc<QueueWindow>>>,
    writer: Arc<Mutex<()>>,
}

impl<S> QueueEngine<S>
where
    S: PlaybackStore + 'static,
{
    pub fn new(store: Arc<S>, ledger: Arc<StatisticsLedger<S>>, config: QueueConfig) -> Self {
        Self {
            store,
            ledger,
            config,
            window: Arc::new(RwLock::new(Arc::new(QueueWindow::empty()))),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Restore the persisted window
    ///
    /// A persisted window that breaks the window invariants is discarded.
    pub async fn load(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let mut window = self.store.load_window().await?;

        if let Err(e) = window.validate() {
            warn!(error = %e, "Discarding invalid persisted queue window");
            window = QueueWindow::empty();
        }

        info!(slots = window.len(), "Queue window restored");
        *self.window.write().await = Arc::new(window);
        Ok(())
    }

    /// Current window snapshot
    pub async fn window(&self) -> Arc<QueueWindow> {
        Arc::clone(&*self.window.read().await)
    }

    /// Take the writer lock and start staging a new window
    pub async fn begin(&self) -> QueueTransaction<S> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        let base = self.window().await;
        QueueTransaction {
            store: Arc::clone(&self.store),
            ledger: Arc::clone(&self.ledger),
            config: self.config,
            window: Arc::clone(&self.window),
            _guard: guard,
            base,
            staged: None,
        }
    }

    /// Build a fresh window from the start of the catalog
    pub async fn initialize(&self, catalog: &[Track]) -> Result<Track> {
        let mut txn = self.begin().await;
        let current = txn.initialize(catalog).await?;
        txn.commit().await?;
        Ok(current)
    }

    /// Initialize only if the window is empty
    ///
    /// Returns `true` when a new window was built.
    pub async fn ensure_initialized(&self, catalog: &[Track]) -> Result<bool> {
        let mut txn = self.begin().await;
        if !txn.window().is_empty() {
            return Ok(false);
        }
        txn.initialize(catalog).await?;
        txn.commit().await?;
        Ok(true)
    }

    /// Make `target` the current position and rebuild the window around it
    pub async fn move_to_position(&self, target: i32, catalog: &[Track]) -> Result<Track> {
        let mut txn = self.begin().await;
        let track = txn.move_to_position(target, catalog).await?;
        txn.commit().await?;
        Ok(track)
    }

    pub async fn move_to_next(&self, catalog: &[Track]) -> Result<Track> {
        self.move_to_position(1, catalog).await
    }

    pub async fn move_to_previous(&self, catalog: &[Track]) -> Result<Track> {
        self.move_to_position(-1, catalog).await
    }

    pub async fn jump_to(&self, position: i32, catalog: &[Track]) -> Result<Track> {
        self.move_to_position(position, catalog).await
    }

    /// Regenerate the upcoming slots, leaving history and current alone
    pub async fn shuffle_upcoming(&self, catalog: &[Track]) -> Result<()> {
        let mut txn = self.begin().await;
        txn.shuffle_upcoming(catalog).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Window joined against the catalog and live play counts
    ///
    /// Slots whose track is no longer in the store are left out and logged
    /// as stale; the window itself is not touched.
    pub async fn snapshot(&self) -> Result<Vec<SnapshotEntry>> {
        let window = self.window().await;
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let ids = window.track_ids();
        let tracks: HashMap<TrackId, Track> = self
            .store
            .get_tracks(&ids)
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        let counts = self.ledger.play_counts(&ids).await;

        let mut entries = Vec::with_capacity(window.len());
        for slot in window.slots() {
            match tracks.get(&slot.track_id) {
                Some(track) => entries.push(SnapshotEntry {
                    position: slot.position,
                    track: track.clone(),
                    play_count: counts.get(&slot.track_id).copied().unwrap_or(0),
                }),
                None => {
                    warn!(
                        track_id = %slot.track_id,
                        position = slot.position,
                        "Stale queue slot: track missing from catalog"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Track at position 0
    pub async fn current_track(&self) -> Result<Option<Track>> {
        let window = self.window().await;
        match window.current() {
            Some(slot) => Ok(self.store.get_track(&slot.track_id).await?),
            None => Ok(None),
        }
    }
}

/// Writer-side handle over the queue window
///
/// Holds the single-writer lock for its whole lifetime. Operations stage a
/// new window on top of whatever was staged before; nothing is visible to
/// readers until [`commit`](Self::commit).
pub struct QueueTransaction<S> {
    store: Arc<S>,
    ledger: Arc<StatisticsLedger<S>>,
    config: QueueConfig,
    window: Arc<RwLock<Arc<QueueWindow>>>,
    _guard: OwnedMutexGuard<()>,
    base: Arc<QueueWindow>,
    staged: Option<QueueWindow>,
}

impl<S> QueueTransaction<S>
where
    S: PlaybackStore + 'static,
{
    /// Window as it was when the transaction started
    pub fn previous(&self) -> &QueueWindow {
        &self.base
    }

    /// Window staged so far, if any operation ran
    pub fn staged(&self) -> Option<&QueueWindow> {
        self.staged.as_ref()
    }

    /// Latest view: the staged window, or the previous one
    pub fn window(&self) -> &QueueWindow {
        self.staged.as_ref().unwrap_or(self.base.as_ref())
    }

    /// Stage a fresh window: `catalog[0]` current, upcoming selected
    pub async fn initialize(&mut self, catalog: &[Track]) -> Result<Track> {
        let Some(current) = catalog.first() else {
            return Err(PlaybackError::EmptyCatalog);
        };

        let now = Utc::now();
        let mut slots = vec![QueueSlot::new(0, current.id.clone(), now)];
        let exclude: HashSet<TrackId> = std::iter::once(current.id.clone()).collect();

        let upcoming = select_tracks(
            &self.ledger,
            self.config.upcoming_limit,
            &exclude,
            catalog,
            Some(0),
        )
        .await;
        append_upcoming(&mut slots, 1, &upcoming, now);

        debug!(track_id = %current.id, upcoming = upcoming.len(), "Staged initial queue window");
        self.staged = Some(QueueWindow::new(slots));
        Ok(current.clone())
    }

    /// Stage a window with `target` renumbered to position 0
    ///
    /// The nearest `history_limit` slots before the target become history
    /// (`-1` nearest). Slots after the target keep their order from `1`,
    /// trimmed to `upcoming_limit`, and the rest is refilled by selection.
    pub async fn move_to_position(&mut self, target: i32, catalog: &[Track]) -> Result<Track> {
        let window = self.window();
        let Some(target_slot) = window.slot_at(target) else {
            return Err(PlaybackError::NoSuchQueuePosition(target));
        };
        let target_id = target_slot.track_id.clone();
        let track = self.resolve(&target_id, catalog).await?;

        let now = Utc::now();
        let mut slots = rebuild_around(self.window(), target, self.config);
        let kept_after = slots.iter().filter(|s| s.position > 0).count();

        let needed = self.config.upcoming_limit.saturating_sub(kept_after);
        if needed > 0 {
            let exclude: HashSet<TrackId> = slots.iter().map(|s| s.track_id.clone()).collect();
            let anchor = catalog.iter().position(|t| t.id == target_id);
            let refill = select_tracks(&self.ledger, needed, &exclude, catalog, anchor).await;
            append_upcoming(&mut slots, kept_after as i32 + 1, &refill, now);
        }

        debug!(
            track_id = %target_id,
            from_position = target,
            slots = slots.len(),
            "Staged queue move"
        );
        self.staged = Some(QueueWindow::new(slots));
        Ok(track)
    }

    /// Stage a window with positions `1..` regenerated
    pub async fn shuffle_upcoming(&mut self, catalog: &[Track]) -> Result<()> {
        let window = self.window();
        let Some(current) = window.current() else {
            return Err(PlaybackError::QueueEmpty);
        };
        let anchor = catalog.iter().position(|t| t.id == current.track_id);

        let mut slots: Vec<QueueSlot> = window
            .slots()
            .iter()
            .filter(|s| s.position <= 0)
            .cloned()
            .collect();
        let exclude: HashSet<TrackId> = slots.iter().map(|s| s.track_id.clone()).collect();

        let upcoming = select_tracks(
            &self.ledger,
            self.config.upcoming_limit,
            &exclude,
            catalog,
            anchor,
        )
        .await;
        append_upcoming(&mut slots, 1, &upcoming, Utc::now());

        debug!(upcoming = upcoming.len(), "Staged upcoming reshuffle");
        self.staged = Some(QueueWindow::new(slots));
        Ok(())
    }

    async fn resolve(&self, id: &TrackId, catalog: &[Track]) -> Result<Track> {
        if let Some(track) = catalog.iter().find(|t| &t.id == id) {
            return Ok(track.clone());
        }
        self.store
            .get_track(id)
            .await?
            .ok_or_else(|| PlaybackError::TrackNotFound(id.clone()))
    }

    /// Persist the staged window and publish it
    ///
    /// Returns the window now visible to readers. With nothing staged this
    /// is the previous window. On a store failure nothing is published.
    pub async fn commit(self) -> Result<Arc<QueueWindow>> {
        let Some(staged) = self.staged else {
            return Ok(self.base);
        };

        self.store.replace_window(&staged).await?;

        let staged = Arc::new(staged);
        *self.window.write().await = Arc::clone(&staged);
        debug!(slots = staged.len(), "Queue window committed");
        Ok(staged)
    }
}

/// Renumber history, current and kept upcoming slots around `target`
fn rebuild_around(window: &QueueWindow, target: i32, config: QueueConfig) -> Vec<QueueSlot> {
    let slots = window.slots();
    let mut rebuilt = Vec::with_capacity(config.history_limit + 1 + config.upcoming_limit);

    // Slots are sorted, so walking backwards visits the nearest history first
    rebuilt.extend(
        slots
            .iter()
            .rev()
            .filter(|s| s.position < target)
            .take(config.history_limit)
            .zip(1..)
            .map(|(s, n): (&QueueSlot, i32)| QueueSlot::new(-n, s.track_id.clone(), s.inserted_at)),
    );

    if let Some(current) = slots.iter().find(|s| s.position == target) {
        rebuilt.push(QueueSlot::new(0, current.track_id.clone(), current.inserted_at));
    }

    let after: Vec<&QueueSlot> = slots.iter().filter(|s| s.position > target).collect();
    if after.len() > config.upcoming_limit {
        debug!(
            dropped = after.len() - config.upcoming_limit,
            "Trimming upcoming slots to capacity"
        );
    }
    rebuilt.extend(
        after
            .into_iter()
            .take(config.upcoming_limit)
            .zip(1..)
            .map(|(s, n): (&QueueSlot, i32)| QueueSlot::new(n, s.track_id.clone(), s.inserted_at)),
    );

    rebuilt
}

fn append_upcoming(slots: &mut Vec<QueueSlot>, first: i32, tracks: &[Track], now: DateTime<Utc>) {
    slots.extend(
        tracks
            .iter()
            .zip(first..)
            .map(|(t, position)| QueueSlot::new(position, t.id.clone(), now)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(entries: &[(i32, &str)]) -> QueueWindow {
        let now = Utc::now();
        QueueWindow::new(
            entries
                .iter()
                .map(|(p, id)| QueueSlot::new(*p, TrackId::new(*id), now))
                .collect(),
        )
    }

    fn layout(slots: &[QueueSlot]) -> Vec<(i32, &str)> {
        let mut sorted: Vec<&QueueSlot> = slots.iter().collect();
        sorted.sort_by_key(|s| s.position);
        sorted
            .into_iter()
            .map(|s| (s.position, s.track_id.as_str()))
            .collect()
    }

    #[test]
    fn test_rebuild_forward() {
        let window = window_of(&[(-2, "a"), (-1, "b"), (0, "c"), (1, "d"), (2, "e"), (3, "f")]);
        let rebuilt = rebuild_around(&window, 2, QueueConfig::default());
        assert_eq!(
            layout(&rebuilt),
            vec![(-4, "a"), (-3, "b"), (-2, "c"), (-1, "d"), (0, "e"), (1, "f")]
        );
    }

    #[test]
    fn test_rebuild_backward_keeps_forward_context() {
        let window = window_of(&[(-2, "a"), (-1, "b"), (0, "c"), (1, "d")]);
        let rebuilt = rebuild_around(&window, -2, QueueConfig::default());
        assert_eq!(
            layout(&rebuilt),
            vec![(0, "a"), (1, "b"), (2, "c"), (3, "d")]
        );
    }

    #[test]
    fn test_rebuild_trims_history_and_upcoming() {
        let config = QueueConfig {
            history_limit: 2,
            upcoming_limit: 1,
        };
        let window = window_of(&[(-2, "a"), (-1, "b"), (0, "c"), (1, "d"), (2, "e"), (3, "f")]);
        let rebuilt = rebuild_around(&window, 1, config);
        assert_eq!(layout(&rebuilt), vec![(-2, "b"), (-1, "c"), (0, "d"), (1, "e")]);
    }

    #[test]
    fn test_rebuild_preserves_insertion_time() {
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let window = QueueWindow::new(vec![
            QueueSlot::new(0, TrackId::new("a"), earlier),
            QueueSlot::new(1, TrackId::new("b"), earlier),
        ]);
        let rebuilt = rebuild_around(&window, 1, QueueConfig::default());
        assert!(rebuilt.iter().all(|s| s.inserted_at == earlier));
    }
}

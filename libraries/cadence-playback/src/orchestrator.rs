//! Session orchestrator
//!
//! Ties the queue engine and the statistics ledger to a remote session.
//! A user intent connects (with retry), builds the window if there is none,
//! stages the queue move, plans any skip penalty, and issues `play`. Only a successful play commits the window and
//! touches statistics; a failed one leaves everything as it was.
//!
//! A background task follows the player's reported state and moves the
//! window when the track changes underneath us.

use crate::catalog::dedupe_tracks;
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::ledger::StatisticsLedger;
use crate::queue::QueueEngine;
use crate::skip::SkipPenalty;
use crate::types::{OrchestratorConfig, SnapshotEntry};
use cadence_core::{CatalogSummary, PlaybackStore, PlayerState, Track, TrackId};
use cadence_remote::{ConnectionState, RemoteSession, RemoteTransport};
use chrono::Utc;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Coordinates queue, ledger, and remote session
pub struct SessionOrchestrator<S, T: RemoteTransport> {
    store: Arc<S>,
    ledger: Arc<StatisticsLedger<S>>,
    queue: QueueEngine<S>,
    session: Arc<RemoteSession<T>>,
    config: OrchestratorConfig,

    catalog: RwLock<Arc<Vec<Track>>>,
    last_state: RwLock<Option<PlayerState>>,
    last_play_command: Mutex<Option<Instant>>,
    published_connection: Mutex<ConnectionState>,

    events: broadcast::Sender<PlaybackEvent>,
    shutdown: CancellationToken,
}

impl<S, T> SessionOrchestrator<S, T>
where
    S: PlaybackStore + 'static,
    T: RemoteTransport,
{
    pub fn new(store: Arc<S>, session: Arc<RemoteSession<T>>, config: OrchestratorConfig) -> Self {
        let ledger = Arc::new(StatisticsLedger::new(Arc::clone(&store)));
        let queue = QueueEngine::new(Arc::clone(&store), Arc::clone(&ledger), config.queue);
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let published_connection = Mutex::new(session.state());

        Self {
            store,
            ledger,
            queue,
            session,
            config,
            catalog: RwLock::new(Arc::new(Vec::new())),
            last_state: RwLock::new(None),
            last_play_command: Mutex::new(None),
            published_connection,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    /// Restore the window and catalog from the store
    pub async fn load(&self) -> Result<()> {
        self.queue.load().await?;
        let tracks = self.store.get_all_tracks().await?;
        info!(tracks = tracks.len(), "Catalog restored");
        *self.catalog.write().await = Arc::new(tracks);
        Ok(())
    }

    /// Install a catalog, seed statistics, and build the window if empty
    ///
    /// Returns the number of distinct tracks installed.
    pub async fn set_catalog(&self, tracks: Vec<Track>) -> Result<usize> {
        let tracks = dedupe_tracks(tracks);
        self.store.upsert_tracks(&tracks).await?;

        let ids: Vec<TrackId> = tracks.iter().map(|t| t.id.clone()).collect();
        self.ledger.seed(&ids).await;

        let catalog = Arc::new(tracks);
        *self.catalog.write().await = Arc::clone(&catalog);

        if !catalog.is_empty() && self.queue.ensure_initialized(&catalog).await? {
            self.publish_queue().await;
        }

        info!(tracks = catalog.len(), "Catalog installed");
        Ok(catalog.len())
    }

    pub async fn catalog(&self) -> Arc<Vec<Track>> {
        Arc::clone(&*self.catalog.read().await)
    }

    pub fn ledger(&self) -> &StatisticsLedger<S> {
        &self.ledger
    }

    pub fn queue(&self) -> &QueueEngine<S> {
        &self.queue
    }

    pub fn session(&self) -> &Arc<RemoteSession<T>> {
        &self.session
    }

    /// Receive orchestrator events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    // ===== Intents =====

    /// Play whatever is at position 0, building the window first if needed
    pub async fn play_current(&self) -> Result<Track> {
        self.connect().await?;

        let catalog = self.catalog().await;
        if self.queue.ensure_initialized(&catalog).await? {
            self.publish_queue().await;
        }

        let window = self.queue.window().await;
        let current = window.current().ok_or(PlaybackError::QueueEmpty)?;
        let track = match catalog.iter().find(|t| t.id == current.track_id) {
            Some(track) => track.clone(),
            None => self
                .store
                .get_track(&current.track_id)
                .await?
                .ok_or_else(|| PlaybackError::TrackNotFound(current.track_id.clone()))?,
        };

        self.dispatch_play(&track).await?;
        self.ledger.record_play(&track.id, Utc::now()).await;

        info!(track_id = %track.id, title = %track.title, "Now playing");
        self.emit(PlaybackEvent::TrackChanged {
            track_id: track.id.clone(),
            previous_track_id: None,
        });
        Ok(track)
    }

    pub async fn next(&self) -> Result<Track> {
        self.move_and_play(1).await
    }

    pub async fn previous(&self) -> Result<Track> {
        self.move_and_play(-1).await
    }

    pub async fn jump_to(&self, position: i32) -> Result<Track> {
        self.move_and_play(position).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.connect().await?;
        let result = self.session.pause().await;
        self.publish_connection_state();
        result.map_err(PlaybackError::from)
    }

    pub async fn resume(&self) -> Result<()> {
        self.connect().await?;
        let result = self.session.resume().await;
        self.publish_connection_state();
        result.map_err(PlaybackError::from)
    }

    /// Regenerate upcoming tracks; the current track keeps playing
    pub async fn shuffle_upcoming(&self) -> Result<()> {
        let catalog = self.catalog().await;
        self.queue.shuffle_upcoming(&catalog).await?;
        self.publish_queue().await;
        Ok(())
    }

    async fn move_and_play(&self, target: i32) -> Result<Track> {
        self.connect().await?;
        let catalog = self.catalog().await;
        if self.queue.ensure_initialized(&catalog).await? {
            self.publish_queue().await;
        }
        if target > 0 {
            self.refresh_player_state().await;
        }

        let mut txn = self.queue.begin().await;
        let previous_id = txn.previous().current().map(|s| s.track_id.clone());
        let track = txn.move_to_position(target, &catalog).await?;

        let penalty = {
            let last_state = self.last_state.read().await.clone();
            let current_track = previous_id
                .as_ref()
                .and_then(|id| catalog.iter().find(|t| &t.id == id));
            SkipPenalty::plan(txn.previous(), target, last_state.as_ref(), current_track)
        };

        // Dropping the transaction on failure discards the staged window
        self.dispatch_play(&track).await?;

        let window = match txn.commit().await {
            Ok(window) => window,
            Err(e) => {
                error!(error = %e, track_id = %track.id, "Playing, but the queue could not be saved");
                self.emit_error(&e);
                return Err(e);
            }
        };

        let now = Utc::now();
        penalty.apply(&self.ledger, now).await;
        self.ledger.record_play(&track.id, now).await;

        info!(track_id = %track.id, title = %track.title, position = target, "Now playing");
        self.emit(PlaybackEvent::TrackChanged {
            track_id: track.id.clone(),
            previous_track_id: previous_id,
        });
        self.emit(PlaybackEvent::QueueUpdated {
            length: window.len(),
        });
        Ok(track)
    }

    /// Read the player's position once when no report has arrived yet
    ///
    /// Without it a one-shot skip has no position to judge a partial play by.
    async fn refresh_player_state(&self) {
        if self.last_state.read().await.is_some() {
            return;
        }

        match self.session.current_state().await {
            Ok(Some(state)) => {
                debug!(
                    track_id = %state.track_id,
                    position_ms = state.position_ms,
                    "Fetched player state"
                );
                *self.last_state.write().await = Some(state);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read player state before skip"),
        }
    }

    async fn connect(&self) -> Result<()> {
        let result = self
            .session
            .connect_with_retry(&self.config.retry, &self.shutdown)
            .await;
        self.publish_connection_state();
        result.map_err(|e| {
            if !e.is_cancelled() {
                warn!(error = %e, "Could not connect to remote player");
            }
            PlaybackError::from(e)
        })
    }

    async fn dispatch_play(&self, track: &Track) -> Result<()> {
        *self
            .last_play_command
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        let result = self.session.play(&track.uri).await;
        self.publish_connection_state();
        result.map_err(|e| {
            warn!(error = %e, track_id = %track.id, "Play command failed");
            PlaybackError::from(e)
        })
    }

    // ===== Reads =====

    pub async fn snapshot(&self) -> Result<Vec<SnapshotEntry>> {
        self.queue.snapshot().await
    }

    pub async fn current_track(&self) -> Result<Option<Track>> {
        self.queue.current_track().await
    }

    /// Catalog tracks matching `query` by title, artist, or album
    pub async fn search(&self, query: &str) -> Result<Vec<Track>> {
        Ok(self.store.search_tracks(query).await?)
    }

    pub async fn catalog_summary(&self) -> Result<CatalogSummary> {
        Ok(self.store.catalog_summary().await?)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub async fn last_player_state(&self) -> Option<PlayerState> {
        self.last_state.read().await.clone()
    }

    // ===== State sync =====

    /// Apply one reported player state
    ///
    /// Moves the window to the reported track if it differs from position 0
    /// and sits elsewhere in the window. Reports that arrive within the grace
    /// period after our own play command are treated as that command still
    /// propagating and ignored. Returns the old position the window moved to.
    pub async fn handle_player_state(&self, state: PlayerState) -> Result<Option<i32>> {
        let previous = self.last_state.write().await.replace(state.clone());
        self.emit(PlaybackEvent::StateChanged {
            state: state.clone(),
        });

        let mut txn = self.queue.begin().await;
        let window = txn.window();
        if window
            .current()
            .is_some_and(|slot| slot.track_id == state.track_id)
        {
            return Ok(None);
        }

        if self.within_grace() {
            debug!(track_id = %state.track_id, "Ignoring track report during play command grace");
            return Ok(None);
        }

        let Some(position) = window.position_of(&state.track_id) else {
            let repeated = previous.is_some_and(|p| p.track_id == state.track_id);
            if !repeated {
                info!(track_id = %state.track_id, "Player is on a track outside the queue");
                self.emit(PlaybackEvent::ExternalTrackChange {
                    track_id: state.track_id,
                    in_window: false,
                });
            }
            return Ok(None);
        };

        let catalog = self.catalog().await;
        txn.move_to_position(position, &catalog).await?;
        let window = txn.commit().await?;

        info!(track_id = %state.track_id, position, "Resynced queue to player");
        self.emit(PlaybackEvent::ExternalTrackChange {
            track_id: state.track_id,
            in_window: true,
        });
        self.emit(PlaybackEvent::QueueUpdated {
            length: window.len(),
        });
        Ok(Some(position))
    }

    /// Follow the player's state until `cancel` fires or reconnecting fails
    pub fn start_state_sync(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_state_sync(cancel).await })
    }

    async fn run_state_sync(&self, cancel: CancellationToken) {
        info!("Player state sync started");

        'session: while !cancel.is_cancelled() {
            let connected = self
                .session
                .connect_with_retry(&self.config.retry, &cancel)
                .await;
            self.publish_connection_state();
            if let Err(e) = connected {
                if !e.is_cancelled() {
                    error!(error = %e, "Player state sync gave up reconnecting");
                    self.emit_error(&PlaybackError::from(e));
                }
                break;
            }

            let mut stream = match self.session.player_state_stream().await {
                Ok(stream) => stream,
                Err(e) => {
                    self.publish_connection_state();
                    warn!(error = %e, "Could not subscribe to player state");
                    if !self.wait_before_resubscribe(&cancel).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                let item = tokio::select! {
                    () = cancel.cancelled() => break 'session,
                    item = stream.next() => item,
                };

                match item {
                    Some(Ok(state)) => {
                        if let Err(e) = self.handle_player_state(state).await {
                            warn!(error = %e, "Failed to resync queue with player");
                            self.emit_error(&e);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Player state stream failed");
                        break;
                    }
                    None => break,
                }
            }

            self.publish_connection_state();
            if !self.wait_before_resubscribe(&cancel).await {
                break;
            }
        }

        info!("Player state sync stopped");
    }

    async fn wait_before_resubscribe(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(self.config.retry.initial_delay) => true,
        }
    }

    fn within_grace(&self) -> bool {
        let last = *self
            .last_play_command
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        last.is_some_and(|at| at.elapsed() < self.config.external_control_grace)
    }

    /// Cancel pending retries and release the session
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.session.disconnect().await;
        self.publish_connection_state();
    }

    // ===== Events =====

    fn emit(&self, event: PlaybackEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn emit_error(&self, err: &PlaybackError) {
        self.emit(PlaybackEvent::Error {
            status: err.status().to_string(),
            message: err.to_string(),
        });
    }

    async fn publish_queue(&self) {
        let length = self.queue.window().await.len();
        self.emit(PlaybackEvent::QueueUpdated { length });
    }

    fn publish_connection_state(&self) {
        let state = self.session.state();
        let mut published = self
            .published_connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *published != state {
            *published = state;
            drop(published);
            debug!(?state, "Connection state changed");
            self.emit(PlaybackEvent::ConnectionChanged { state });
        }
    }
}

//! Remote session manager
//!
//! Owns the connection lifecycle. Only the connect step retries; commands
//! fail fast with [`RemoteError::NotConnected`] so a playback command is
//! never dispatched twice by this layer.

use cadence_core::PlayerState;
use crate::error::{RemoteError, Result};
use crate::stream::PlayerStateStream;
use crate::transport::RemoteTransport;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Exponential backoff settings for [`RemoteSession::connect_with_retry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total connect attempts (`0` is treated as `1`)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Resets the state to `Disconnected` if a connect attempt is dropped mid-flight
struct ConnectingGuard<'a> {
    state: &'a watch::Sender<ConnectionState>,
    armed: bool,
}

impl ConnectingGuard<'_> {
    fn settle(mut self, state: ConnectionState) {
        self.armed = false;
        self.state.send_replace(state);
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(ConnectionState::Disconnected);
        }
    }
}

/// Session manager over a [`RemoteTransport`]
pub struct RemoteSession<T: RemoteTransport> {
    transport: Arc<T>,
    state: Arc<watch::Sender<ConnectionState>>,
    connect_lock: tokio::sync::Mutex<()>,
    active_stream: Mutex<Option<CancellationToken>>,
}

impl<T: RemoteTransport> RemoteSession<T> {
    pub fn new(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<T>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            state: Arc::new(state),
            connect_lock: tokio::sync::Mutex::new(()),
            active_stream: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the session; no-op if already connected
    pub async fn connect(&self) -> Result<()> {
        let _lock = self.connect_lock.lock().await;

        if self.is_connected() {
            return Ok(());
        }

        self.state.send_replace(ConnectionState::Connecting);
        let guard = ConnectingGuard {
            state: &self.state,
            armed: true,
        };

        match self.transport.open().await {
            Ok(()) => {
                guard.settle(ConnectionState::Connected);
                info!("Connected to remote player");
                Ok(())
            }
            Err(e) => {
                guard.settle(ConnectionState::Disconnected);
                debug!(error = %e, "Remote connect failed");
                Err(e)
            }
        }
    }

    /// Connect with exponential backoff
    ///
    /// Sleeps `initial_delay`, doubling up to `max_delay`, between failed
    /// attempts and returns the last result. Cancelling `cancel` aborts
    /// immediately with [`RemoteError::Cancelled`] and leaves the session
    /// `Disconnected`.
    pub async fn connect_with_retry(
        &self,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let max_attempts = policy.max_attempts.max(1);
        let mut delay = policy.initial_delay;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(self.abort_retry(false).await);
            }

            debug!(attempt, max_attempts, "Connecting to remote player");

            let result = tokio::select! {
                () = cancel.cancelled() => return Err(self.abort_retry(true).await),
                result = self.connect() => result,
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Connection attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                tokio::select! {
                    () = cancel.cancelled() => return Err(self.abort_retry(false).await),
                    () = tokio::time::sleep(delay) => {}
                }
                delay = (delay * 2).min(policy.max_delay);
            }
        }

        Err(last_error.unwrap_or_else(|| RemoteError::Connect("no connection attempt made".into())))
    }

    async fn abort_retry(&self, attempt_in_flight: bool) -> RemoteError {
        info!("Connection retry cancelled");
        if attempt_in_flight {
            if let Err(e) = self.transport.close().await {
                debug!(error = %e, "Close after cancelled connect failed");
            }
        }
        self.state.send_replace(ConnectionState::Disconnected);
        RemoteError::Cancelled
    }

    pub async fn play(&self, uri: &str) -> Result<()> {
        self.ensure_connected()?;
        debug!(uri = %uri, "Dispatching play");
        self.dispatch("play", self.transport.play(uri)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.ensure_connected()?;
        self.dispatch("pause", self.transport.pause()).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.ensure_connected()?;
        self.dispatch("resume", self.transport.resume()).await
    }

    /// Read the player's state once
    ///
    /// A failed read is reported to the caller but leaves the connection
    /// state alone; only commands and subscriptions drop the session.
    pub async fn current_state(&self) -> Result<Option<PlayerState>> {
        self.ensure_connected()?;
        self.transport.current_state().await
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(RemoteError::NotConnected)
        }
    }

    async fn dispatch(
        &self,
        command: &'static str,
        call: impl Future<Output = Result<()>>,
    ) -> Result<()> {
        match call.await {
            Ok(()) => {
                debug!(command, "Remote command succeeded");
                Ok(())
            }
            Err(e) => {
                warn!(command, error = %e, "Remote command failed");
                self.state.send_replace(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Subscribe to player-state updates
    ///
    /// Only one subscription is live at a time; opening a new one cancels
    /// the previous stream.
    pub async fn player_state_stream(&self) -> Result<PlayerStateStream> {
        self.ensure_connected()?;

        let subscription = match self.transport.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "Player state subscription failed");
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let id = Uuid::new_v4();
        let previous = self
            .active_stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(subscription.cancel_token());
        if let Some(previous) = previous {
            previous.cancel();
        }

        debug!(subscription = %id, "Player state stream opened");
        Ok(PlayerStateStream::new(id, subscription, Arc::clone(&self.state)))
    }

    /// Release the session; idempotent
    pub async fn disconnect(&self) {
        let active = self
            .active_stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = active {
            token.cancel();
        }

        let previous = self.state.send_replace(ConnectionState::Disconnected);
        if previous == ConnectionState::Disconnected {
            return;
        }

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "Error while closing remote session");
        }
        info!("Disconnected from remote player");
    }
}

//! Transport abstraction
//!
//! A transport is the external session object: it opens and closes the
//! connection, dispatches commands, and pushes player-state updates.

use crate::error::Result;
use async_trait::async_trait;
use cadence_core::PlayerState;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Connection to a remote playback endpoint
#[async_trait]
pub trait RemoteTransport: Send + Sync + 'static {
    /// Open a session (may wait on out-of-band user consent)
    async fn open(&self) -> Result<()>;

    /// Release the session
    async fn close(&self) -> Result<()>;

    /// Start playing the given resource URI
    async fn play(&self, uri: &str) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Read the player's state once; `None` when nothing is playing
    async fn current_state(&self) -> Result<Option<PlayerState>>;

    /// Start a push-style player-state subscription
    ///
    /// The producer must stop and drop its sender once the subscription's
    /// token is cancelled.
    async fn subscribe(&self) -> Result<Subscription>;
}

/// Consumer side of a player-state subscription
#[derive(Debug)]
pub struct Subscription {
    pub(crate) receiver: mpsc::Receiver<Result<PlayerState>>,
    pub(crate) cancel: CancellationToken,
}

impl Subscription {
    /// Create a connected producer/consumer pair
    pub fn channel(buffer: usize) -> (StateSender, Subscription) {
        let (tx, receiver) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        (
            StateSender {
                tx,
                cancel: cancel.clone(),
            },
            Subscription { receiver, cancel },
        )
    }

    /// Token that unsubscribes the producer when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Producer side of a player-state subscription
#[derive(Debug, Clone)]
pub struct StateSender {
    tx: mpsc::Sender<Result<PlayerState>>,
    cancel: CancellationToken,
}

impl StateSender {
    /// Push an update; returns `false` once the subscriber is gone
    pub async fn send(&self, item: Result<PlayerState>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(item) => sent.is_ok(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves when the subscriber unsubscribes
    pub async fn cancelled(&self) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = self.tx.closed() => {}
        }
    }
}

//! Player-state stream

use crate::error::Result;
use crate::session::ConnectionState;
use crate::transport::Subscription;
use cadence_core::PlayerState;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Cancellable stream of player-state updates
///
/// Ends with a single `Err` item on transport failure, after which the
/// session is `Disconnected`. Yields nothing once cancelled. Dropping the
/// stream cancels the underlying subscription.
pub struct PlayerStateStream {
    id: Uuid,
    subscription: Subscription,
    state: Arc<watch::Sender<ConnectionState>>,
    finished: bool,
}

impl PlayerStateStream {
    pub(crate) fn new(
        id: Uuid,
        subscription: Subscription,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        Self {
            id,
            subscription,
            state,
            finished: false,
        }
    }

    /// Unsubscribe; no further items are yielded
    pub fn cancel(&self) {
        self.subscription.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.subscription.cancel.is_cancelled()
    }

    /// Token that cancels this stream
    pub fn cancel_token(&self) -> CancellationToken {
        self.subscription.cancel_token()
    }

    fn finish(&mut self) {
        self.finished = true;
        self.subscription.cancel.cancel();
    }
}

impl Stream for PlayerStateStream {
    type Item = Result<PlayerState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished || self.subscription.cancel.is_cancelled() {
            return Poll::Ready(None);
        }

        match self.subscription.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(state))) => Poll::Ready(Some(Ok(state))),
            Poll::Ready(Some(Err(e))) => {
                warn!(subscription = %self.id, error = %e, "Player state stream failed");
                self.finish();
                self.state.send_replace(ConnectionState::Disconnected);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                // Producer went away without being asked to
                if !self.subscription.cancel.is_cancelled() {
                    debug!(subscription = %self.id, "Player state producer closed");
                    self.state.send_replace(ConnectionState::Disconnected);
                }
                self.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PlayerStateStream {
    fn drop(&mut self) {
        self.subscription.cancel.cancel();
    }
}

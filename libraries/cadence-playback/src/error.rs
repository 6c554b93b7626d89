//! Error types for playback management

use cadence_core::{CoreError, TrackId};
use cadence_remote::RemoteError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Command issued without a live session
    #[error("Not connected to remote player")]
    NotConnected,

    /// Window references a track the catalog does not know
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// Jump target is not in the window
    #[error("No track at queue position {0}")]
    NoSuchQueuePosition(i32),

    /// Connect, command, or stream failure
    #[error("Transport failure: {0}")]
    TransportFailure(#[source] RemoteError),

    /// Initialize called with no tracks
    #[error("Catalog is empty")]
    EmptyCatalog,

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Operation cancelled before completion
    #[error("Operation cancelled")]
    Cancelled,

    /// Catalog source failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Persisted store failed
    #[error("Storage error: {0}")]
    Storage(#[from] CoreError),
}

impl PlaybackError {
    /// Short, stable message suitable for display
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConnected => "Not connected to the player",
            Self::TrackNotFound(_) => "Track not found",
            Self::NoSuchQueuePosition(_) => "No track at that queue position",
            Self::TransportFailure(_) => "The player did not accept the command",
            Self::EmptyCatalog => "Your library is empty",
            Self::QueueEmpty => "The queue is empty",
            Self::Cancelled => "Cancelled",
            Self::Catalog(_) => "Could not load your library",
            Self::Storage(_) => "Could not save playback state",
        }
    }

    /// Stable snake_case status code
    pub fn status(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::TrackNotFound(_) => "track_not_found",
            Self::NoSuchQueuePosition(_) => "no_such_queue_position",
            Self::TransportFailure(_) => "transport_failure",
            Self::EmptyCatalog => "empty_catalog",
            Self::QueueEmpty => "queue_empty",
            Self::Cancelled => "cancelled",
            Self::Catalog(_) => "catalog_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<RemoteError> for PlaybackError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotConnected => Self::NotConnected,
            RemoteError::Cancelled => Self::Cancelled,
            other => Self::TransportFailure(other),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

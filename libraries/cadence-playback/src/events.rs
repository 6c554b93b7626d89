//! Playback Events
//!
//! Broadcast by the orchestrator so UIs can follow along:
//! - Track and queue changes caused by our own commands
//! - Player state reported by the remote endpoint
//! - Track changes started from another client
//! - Connection transitions and errors

use cadence_core::{PlayerState, TrackId};
use cadence_remote::ConnectionState;
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// A play command succeeded and the window moved
    TrackChanged {
        /// ID of the new (current) track
        track_id: TrackId,
        /// ID of the previous track (if any)
        previous_track_id: Option<TrackId>,
    },

    /// The window was replaced
    QueueUpdated {
        /// Number of occupied slots
        length: usize,
    },

    /// Latest state reported by the remote player
    StateChanged { state: PlayerState },

    /// The player switched tracks without us
    ///
    /// `in_window` is `false` when the track could not be found in the queue,
    /// in which case the window is left alone.
    ExternalTrackChange { track_id: TrackId, in_window: bool },

    /// Session connection state changed
    ConnectionChanged { state: ConnectionState },

    /// Background failure worth surfacing
    Error {
        /// Stable status code
        status: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlaybackEvent::ExternalTrackChange {
            track_id: TrackId::new("t9"),
            in_window: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "external_track_change");
        assert_eq!(json["track_id"], "t9");
        assert_eq!(json["in_window"], false);
    }
}

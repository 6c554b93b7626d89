/// Remote player state
use super::TrackId;
use serde::{Deserialize, Serialize};

/// Transient state reported by the remote endpoint
///
/// Never persisted. Used to detect drift between the queue's current track
/// and what is actually playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub track_id: TrackId,
    pub is_playing: bool,
    pub position_ms: u64,
    /// `0` when the endpoint does not report a duration
    pub duration_ms: u64,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
}

impl PlayerState {
    pub fn new(track_id: TrackId, is_playing: bool, position_ms: u64, duration_ms: u64) -> Self {
        Self {
            track_id,
            is_playing,
            position_ms,
            duration_ms,
            artist: String::new(),
            album: String::new(),
        }
    }

    pub fn is_paused(&self) -> bool {
        !self.is_playing
    }

    /// Whether playback stopped before the halfway point
    ///
    /// `fallback_duration_ms` is used when the endpoint reports no duration.
    /// Returns `false` when no duration is known at all.
    pub fn is_before_halfway(&self, fallback_duration_ms: Option<u64>) -> bool {
        let duration = if self.duration_ms > 0 {
            self.duration_ms
        } else {
            match fallback_duration_ms {
                Some(d) if d > 0 => d,
                _ => return false,
            }
        };

        self.position_ms < duration / 2
    }
}

/// Track domain type
use super::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Immutable catalog record
///
/// Owned by the catalog store. The queue and the statistics ledger only hold
/// its [`TrackId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Artist display string (already joined, e.g. "A, B")
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub cover_art_url: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Playable resource URI handed to the remote endpoint
    pub uri: String,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl Track {
    /// Create a track with empty display metadata
    pub fn new(id: impl Into<String>, title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            cover_art_url: None,
            duration_ms: None,
            uri: uri.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Builder: set artist and album display strings
    #[must_use]
    pub fn with_credits(mut self, artist: impl Into<String>, album: impl Into<String>) -> Self {
        self.artist = artist.into();
        self.album = album.into();
        self
    }

    /// Builder: set duration in milliseconds
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Duration as a `Duration`, if known
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

/// Aggregate view over the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub track_count: usize,
    /// Sum of known durations; tracks without one count as zero
    pub total_duration_ms: u64,
    /// Distinct non-empty artist strings
    pub unique_artists: usize,
}

impl CatalogSummary {
    /// Summarize a set of tracks
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let artists: HashSet<&str> = tracks
            .iter()
            .map(|t| t.artist.as_str())
            .filter(|a| !a.is_empty())
            .collect();

        Self {
            track_count: tracks.len(),
            total_duration_ms: tracks.iter().filter_map(|t| t.duration_ms).sum(),
            unique_artists: artists.len(),
        }
    }

    /// No tracks have been imported yet
    pub fn is_empty(&self) -> bool {
        self.track_count == 0
    }

    /// Total duration as `"{hours}h {minutes}m"`
    pub fn total_duration_formatted(&self) -> String {
        let minutes = self.total_duration_ms / 60_000;
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Statistics and audit history types
use super::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of audit-log entries retained
pub const HISTORY_LOG_LIMIT: usize = 20;

/// Per-track play statistics
///
/// `play_count` never decreases. Skips count as extra plays so skipped
/// tracks sort later in least-played order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackStatistics {
    pub track_id: TrackId,
    pub play_count: u64,
    /// `None` means never played or skipped
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl TrackStatistics {
    /// Zero-count statistics for a freshly seeded track
    pub fn new(track_id: TrackId) -> Self {
        Self {
            track_id,
            play_count: 0,
            last_activity_at: None,
        }
    }
}

/// One audit-log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track_id: TrackId,
    pub played_at: DateTime<Utc>,
    pub was_skipped: bool,
    /// Observed playback position when the event happened
    pub playback_position_ms: Option<u64>,
}

impl HistoryEntry {
    pub fn played(track_id: TrackId, played_at: DateTime<Utc>) -> Self {
        Self {
            track_id,
            played_at,
            was_skipped: false,
            playback_position_ms: None,
        }
    }

    pub fn skipped(
        track_id: TrackId,
        played_at: DateTime<Utc>,
        playback_position_ms: Option<u64>,
    ) -> Self {
        Self {
            track_id,
            played_at,
            was_skipped: true,
            playback_position_ms,
        }
    }
}

/// Aggregate view over all statistics rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub tracked: usize,
    pub never_played: usize,
    pub min_play_count: u64,
    pub max_play_count: u64,
}

impl StatisticsSummary {
    /// Summarize a set of statistics rows
    pub fn from_rows(rows: &[TrackStatistics]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }

        Self {
            tracked: rows.len(),
            never_played: rows.iter().filter(|r| r.last_activity_at.is_none()).count(),
            min_play_count: rows.iter().map(|r| r.play_count).min().unwrap_or(0),
            max_play_count: rows.iter().map(|r| r.play_count).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_rows() {
        let mut played = TrackStatistics::new(TrackId::new("a"));
        played.play_count = 5;
        played.last_activity_at = Some(Utc::now());

        let fresh = TrackStatistics::new(TrackId::new("b"));

        let summary = StatisticsSummary::from_rows(&[played, fresh]);
        assert_eq!(summary.tracked, 2);
        assert_eq!(summary.never_played, 1);
        assert_eq!(summary.min_play_count, 0);
        assert_eq!(summary.max_play_count, 5);
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(StatisticsSummary::from_rows(&[]), StatisticsSummary::default());
    }
}

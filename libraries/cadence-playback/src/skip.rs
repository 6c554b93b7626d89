//! Skip accounting
//!
//! A forward jump from position 0 to `target > 0` costs:
//! - the current track `+1` if it was abandoned before halfway
//! - every track strictly between 0 and `target` `+2`
//!
//! The penalty is planned from the window before the move and applied only
//! once the play command for the new track has succeeded.

use crate::ledger::{StatisticsLedger, PARTIAL_PLAY_WEIGHT, SKIP_WEIGHT};
use cadence_core::{HistoryStore, PlayerState, QueueWindow, StatisticsStore, Track, TrackId};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Current track abandoned before its halfway point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialPlay {
    pub track_id: TrackId,
    pub position_ms: u64,
}

/// Statistics penalty for tracks passed over by a move
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipPenalty {
    pub partial: Option<PartialPlay>,
    /// Tracks strictly between the current position and the target
    pub skipped: Vec<TrackId>,
}

impl SkipPenalty {
    /// Plan the penalty for moving from position 0 to `target`
    ///
    /// `last_state` only counts when it reports the current track.
    /// `current_track` supplies the duration when the player reported none.
    pub fn plan(
        window: &QueueWindow,
        target: i32,
        last_state: Option<&PlayerState>,
        current_track: Option<&Track>,
    ) -> Self {
        if target <= 0 {
            return Self::default();
        }
        let Some(current) = window.current() else {
            return Self::default();
        };

        let partial = last_state
            .filter(|state| state.track_id == current.track_id)
            .filter(|state| {
                let fallback = current_track
                    .filter(|t| t.id == current.track_id)
                    .and_then(|t| t.duration_ms);
                state.is_before_halfway(fallback)
            })
            .map(|state| PartialPlay {
                track_id: current.track_id.clone(),
                position_ms: state.position_ms,
            });

        let skipped = window
            .upcoming()
            .into_iter()
            .filter(|slot| slot.position < target)
            .map(|slot| slot.track_id.clone())
            .collect();

        Self { partial, skipped }
    }

    pub fn is_empty(&self) -> bool {
        self.partial.is_none() && self.skipped.is_empty()
    }

    /// Apply the planned increments and log each skip
    pub async fn apply<S>(&self, ledger: &StatisticsLedger<S>, now: DateTime<Utc>)
    where
        S: StatisticsStore + HistoryStore,
    {
        if self.is_empty() {
            return;
        }

        if let Some(partial) = &self.partial {
            ledger
                .increment_by(std::slice::from_ref(&partial.track_id), PARTIAL_PLAY_WEIGHT, now)
                .await;
            ledger
                .log_skip(&partial.track_id, now, Some(partial.position_ms))
                .await;
        }

        ledger.increment_by(&self.skipped, SKIP_WEIGHT, now).await;
        for id in &self.skipped {
            ledger.log_skip(id, now, None).await;
        }

        debug!(
            partial = self.partial.is_some(),
            skipped = self.skipped.len(),
            "Applied skip penalty"
        );
    }
}

//! Queue window types
//!
//! The window is a position-indexed view over the catalog:
//! - positions `-HISTORY_LIMIT..=-1` are navigable history (`-1` = most recent)
//! - position `0` is the current track
//! - positions `1..=UPCOMING_LIMIT` are upcoming tracks

use super::TrackId;
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of history slots kept behind the current track
pub const HISTORY_LIMIT: usize = 20;

/// Number of upcoming slots kept ahead of the current track
pub const UPCOMING_LIMIT: usize = 30;

/// One occupied position in the queue window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSlot {
    pub position: i32,
    pub track_id: TrackId,
    pub inserted_at: DateTime<Utc>,
}

impl QueueSlot {
    pub fn new(position: i32, track_id: TrackId, inserted_at: DateTime<Utc>) -> Self {
        Self {
            position,
            track_id,
            inserted_at,
        }
    }
}

/// Immutable snapshot of the full queue window
///
/// Slots are kept sorted by position. A window is never edited in place;
/// mutations build a new `QueueWindow` and swap it in whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueWindow {
    slots: Vec<QueueSlot>,
}

impl QueueWindow {
    /// Build a window from slots in any order
    pub fn new(mut slots: Vec<QueueSlot>) -> Self {
        slots.sort_by_key(|s| s.position);
        Self { slots }
    }

    /// Empty window
    pub fn empty() -> Self {
        Self::default()
    }

    /// All slots, ordered by position
    pub fn slots(&self) -> &[QueueSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at position 0
    pub fn current(&self) -> Option<&QueueSlot> {
        self.slot_at(0)
    }

    /// Slot at an arbitrary position
    pub fn slot_at(&self, position: i32) -> Option<&QueueSlot> {
        self.slots
            .binary_search_by_key(&position, |s| s.position)
            .ok()
            .map(|idx| &self.slots[idx])
    }

    /// Position holding the given track, if any
    pub fn position_of(&self, track_id: &TrackId) -> Option<i32> {
        self.slots
            .iter()
            .find(|s| &s.track_id == track_id)
            .map(|s| s.position)
    }

    /// History slots, nearest first (`-1, -2, ...`)
    pub fn history(&self) -> Vec<&QueueSlot> {
        self.slots.iter().rev().filter(|s| s.position < 0).collect()
    }

    /// Upcoming slots in play order (`1, 2, ...`)
    pub fn upcoming(&self) -> Vec<&QueueSlot> {
        self.slots.iter().filter(|s| s.position > 0).collect()
    }

    /// Track IDs in position order
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.slots.iter().map(|s| s.track_id.clone()).collect()
    }

    /// Set of every track ID present in the window
    pub fn id_set(&self) -> HashSet<TrackId> {
        self.slots.iter().map(|s| s.track_id.clone()).collect()
    }

    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.slots.iter().any(|s| &s.track_id == track_id)
    }

    /// Check the window invariants
    ///
    /// Positions must be unique, no track may appear twice, and position 0
    /// must exist whenever the window is non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Ok(());
        }

        for pair in self.slots.windows(2) {
            if pair[0].position == pair[1].position {
                return Err(CoreError::InvalidWindow(format!(
                    "duplicate position {}",
                    pair[0].position
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.slots.len());
        for slot in &self.slots {
            if !seen.insert(&slot.track_id) {
                return Err(CoreError::InvalidWindow(format!(
                    "track {} appears more than once",
                    slot.track_id
                )));
            }
        }

        if self.current().is_none() {
            return Err(CoreError::InvalidWindow(
                "non-empty window has no current slot".to_string(),
            ));
        }

        Ok(())
    }
}

//! Core types for playback management

use cadence_core::{Track, HISTORY_LIMIT, UPCOMING_LIMIT};
use cadence_remote::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue window sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// History slots kept behind the current track
    pub history_limit: usize,

    /// Upcoming slots kept ahead of the current track
    pub upcoming_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            upcoming_limit: UPCOMING_LIMIT,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Backoff for the connect step
    pub retry: RetryPolicy,

    /// Queue window sizing
    pub queue: QueueConfig,

    /// Track changes reported later than this after our own play command
    /// are treated as externally initiated
    pub external_control_grace: Duration,

    /// Broadcast buffer for [`crate::PlaybackEvent`]s
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            queue: QueueConfig::default(),
            external_control_grace: Duration::from_secs(5),
            event_buffer: 64,
        }
    }
}

/// One row of a queue snapshot, joined against the catalog and ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub position: i32,
    pub track: Track,
    pub play_count: u64,
}

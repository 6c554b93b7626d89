//! Cadence Core
//!
//! Platform-agnostic core types, store traits, and error handling for Cadence.
//!
//! This crate provides the building blocks shared by the queue engine, the
//! storage layer, and the remote session manager.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `QueueSlot`, `QueueWindow`, `TrackStatistics`,
//!   `HistoryEntry`, `PlayerState`
//! - **Store Traits**: `CatalogStore`, `QueueStore`, `StatisticsStore`, `HistoryStore`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::{QueueSlot, QueueWindow, Track, TrackId};
//! use chrono::Utc;
//!
//! let track = Track::new("t1", "Song One", "remote:track:t1");
//!
//! let window = QueueWindow::new(vec![QueueSlot::new(0, track.id.clone(), Utc::now())]);
//! assert_eq!(window.current().map(|s| &s.track_id), Some(&TrackId::new("t1")));
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use store::{CatalogStore, HistoryStore, MemoryStore, PlaybackStore, QueueStore, StatisticsStore};

pub use types::{
    CatalogSummary, HistoryEntry, PlayerState, QueueSlot, QueueWindow, StatisticsSummary, Track,
    TrackId, TrackStatistics, HISTORY_LIMIT, HISTORY_LOG_LIMIT, UPCOMING_LIMIT,
};

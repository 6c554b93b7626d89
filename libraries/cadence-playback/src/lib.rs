//! Cadence - Playback Management
//!
//! Least-played queue engine and remote-session orchestration.
//!
//! This crate provides:
//! - Statistics ledger (play counts, skip penalties, audit history)
//! - Least-played selection with a deterministic wrap-around fallback
//! - Position-indexed queue window (20 history, current, 30 upcoming)
//! - Staged queue transactions committed only after a successful play
//! - Skip accounting for tracks passed over
//! - Session orchestrator tying the queue to a remote player
//!
//! # Architecture
//!
//! `cadence-playback` never talks to a database or the network directly:
//! - Persistence goes through the [`cadence_core::PlaybackStore`] traits
//! - Playback commands go through [`cadence_remote::RemoteSession`]
//!
//! # Example: Queue Navigation
//!
//! ```rust
//! use cadence_core::{MemoryStore, Track};
//! use cadence_playback::{QueueConfig, QueueEngine, StatisticsLedger};
//! use std::sync::Arc;
//!
//! # tokio_test_block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! let ledger = Arc::new(StatisticsLedger::new(Arc::clone(&store)));
//! let queue = QueueEngine::new(store, ledger, QueueConfig::default());
//!
//! let catalog: Vec<Track> = (1..=5)
//!     .map(|i| Track::new(format!("t{i}"), format!("Song {i}"), format!("remote:track:t{i}")))
//!     .collect();
//!
//! queue.ensure_initialized(&catalog).await.unwrap();
//! let next = queue.move_to_next(&catalog).await.unwrap();
//! assert_eq!(next.id.as_str(), "t2");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod events;
pub mod ledger;
pub mod orchestrator;
pub mod queue;
pub mod shuffle;
pub mod skip;
pub mod types;

// Re-export main types
pub use catalog::{
    dedupe_tracks, fetch_catalog, fetch_catalog_with_progress, CatalogPage, CatalogSource,
    FetchProgress, StaticCatalog,
};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use ledger::{StatisticsLedger, PARTIAL_PLAY_WEIGHT, PLAY_WEIGHT, SKIP_WEIGHT};
pub use orchestrator::SessionOrchestrator;
pub use queue::{QueueEngine, QueueTransaction};
pub use shuffle::{select_tracks, wrap_around_fill};
pub use skip::{PartialPlay, SkipPenalty};
pub use types::{OrchestratorConfig, QueueConfig, SnapshotEntry};

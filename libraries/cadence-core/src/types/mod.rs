//! Domain types for Cadence

mod ids;
mod player_state;
mod queue;
mod statistics;
mod track;

pub use ids::TrackId;
pub use player_state::PlayerState;
pub use queue::{QueueSlot, QueueWindow, HISTORY_LIMIT, UPCOMING_LIMIT};
pub use statistics::{HistoryEntry, StatisticsSummary, TrackStatistics, HISTORY_LOG_LIMIT};
pub use track::{CatalogSummary, Track};

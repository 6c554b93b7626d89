//! Track selection for upcoming slots
//!
//! Least-played first, so new and rarely played tracks surface early.
//! When the ledger cannot supply enough tracks (cold start, exhausted pool)
//! the catalog is walked in a circle from the anchor for a deterministic fill.

use crate::ledger::StatisticsLedger;
use cadence_core::{HistoryStore, StatisticsStore, Track, TrackId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Select up to `count` tracks not in `exclude`
///
/// `anchor_index` is the catalog index the walk continues after; `None` or
/// an out-of-range index starts the walk at the first catalog entry.
pub async fn select_tracks<S>(
    ledger: &StatisticsLedger<S>,
    count: usize,
    exclude: &HashSet<TrackId>,
    catalog: &[Track],
    anchor_index: Option<usize>,
) -> Vec<Track>
where
    S: StatisticsStore + HistoryStore,
{
    if count == 0 || catalog.is_empty() {
        return Vec::new();
    }

    let by_id: HashMap<&TrackId, &Track> = catalog.iter().map(|t| (&t.id, t)).collect();

    let mut selected: Vec<Track> = ledger
        .least_played(count, exclude)
        .await
        .into_iter()
        .filter(|id| !exclude.contains(id))
        .filter_map(|id| by_id.get(&id).map(|t| (*t).clone()))
        .take(count)
        .collect();

    if selected.len() < count {
        let from_ledger = selected.len();
        wrap_around_fill(catalog, anchor_index, exclude, count, &mut selected);
        debug!(
            from_ledger,
            from_fill = selected.len() - from_ledger,
            "Filled selection from catalog order"
        );
    }

    selected
}

/// Walk the catalog once, starting after the anchor, appending tracks that
/// are neither excluded nor already selected until `count` is reached
pub fn wrap_around_fill(
    catalog: &[Track],
    anchor_index: Option<usize>,
    exclude: &HashSet<TrackId>,
    count: usize,
    selected: &mut Vec<Track>,
) {
    let len = catalog.len();
    if len == 0 || selected.len() >= count {
        return;
    }

    let start = match anchor_index {
        Some(idx) if idx < len => (idx + 1) % len,
        _ => 0,
    };

    let mut taken: HashSet<TrackId> = selected.iter().map(|t| t.id.clone()).collect();

    // One full circuit; a second pass could add nothing new
    for offset in 0..len {
        if selected.len() >= count {
            break;
        }
        let track = &catalog[(start + offset) % len];
        if exclude.contains(&track.id) || taken.contains(&track.id) {
            continue;
        }
        taken.insert(track.id.clone());
        selected.push(track.clone());
    }
}

//! Catalog sync
//!
//! Pulls a paginated catalog, flattens it and dedupes by track ID (first
//! occurrence wins).

use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use cadence_core::{Track, TrackId};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One page of a catalog listing
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub items: Vec<Track>,
    /// Cursor for the next page; `None` on the last page
    pub next_cursor: Option<String>,
    /// Total catalog size, when the source reports one
    pub total: Option<usize>,
}

/// Paginated catalog source
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CatalogPage>;
}

/// Progress after each fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub pages: usize,
    /// Items received so far, before deduplication
    pub fetched: usize,
    /// Latest total reported by the source
    pub total: Option<usize>,
}

/// Fetch every page, sleeping `page_delay` between requests
pub async fn fetch_catalog<C>(source: &C, page_delay: Duration) -> Result<Vec<Track>>
where
    C: CatalogSource + ?Sized,
{
    fetch_catalog_with_progress(source, page_delay, |_| {}).await
}

/// [`fetch_catalog`], calling `on_progress` after every page
pub async fn fetch_catalog_with_progress<C, F>(
    source: &C,
    page_delay: Duration,
    mut on_progress: F,
) -> Result<Vec<Track>>
where
    C: CatalogSource + ?Sized,
    F: FnMut(&FetchProgress) + Send,
{
    let mut tracks = Vec::new();
    let mut seen_cursors = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut progress = FetchProgress {
        pages: 0,
        fetched: 0,
        total: None,
    };

    loop {
        let page = source.fetch_page(cursor.as_deref()).await?;
        progress.pages += 1;
        progress.fetched += page.items.len();
        progress.total = page.total.or(progress.total);
        debug!(
            page = progress.pages,
            items = page.items.len(),
            fetched = progress.fetched,
            total = ?progress.total,
            "Fetched catalog page"
        );
        on_progress(&progress);
        tracks.extend(page.items);

        match page.next_cursor {
            Some(next) if !seen_cursors.insert(next.clone()) => {
                warn!(cursor = %next, "Catalog source repeated a cursor, stopping");
                break;
            }
            Some(next) => {
                cursor = Some(next);
                if !page_delay.is_zero() {
                    tokio::time::sleep(page_delay).await;
                }
            }
            None => break,
        }
    }

    let tracks = dedupe_tracks(tracks);
    info!(pages = progress.pages, tracks = tracks.len(), "Catalog fetched");
    Ok(tracks)
}

/// Drop repeated track IDs, keeping the first occurrence
pub fn dedupe_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<TrackId> = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}

/// Fixed track list served in pages
///
/// Cursors are stringified offsets.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    tracks: Vec<Track>,
    page_size: usize,
}

impl StaticCatalog {
    pub fn new(tracks: Vec<Track>, page_size: usize) -> Self {
        Self {
            tracks,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let offset = match cursor {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| PlaybackError::Catalog(format!("invalid cursor: {}", raw)))?,
            None => 0,
        };

        let end = offset.saturating_add(self.page_size).min(self.tracks.len());
        let items = self.tracks.get(offset..end).map(<[Track]>::to_vec).unwrap_or_default();
        let next_cursor = (end < self.tracks.len()).then(|| end.to_string());

        Ok(CatalogPage {
            items,
            next_cursor,
            total: Some(self.tracks.len()),
        })
    }
}

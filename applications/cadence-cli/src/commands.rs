//! Subcommand handlers
//!
//! Handlers print human-readable output to stdout. Logging goes to stderr.

use anyhow::Context;
use cadence_core::{CatalogSummary, HistoryEntry, StatisticsSummary, Track, TrackId};
use cadence_playback::{
    fetch_catalog_with_progress, FetchProgress, SessionOrchestrator, SnapshotEntry, StaticCatalog,
};
use cadence_remote::HttpTransport;
use cadence_storage::SqliteStore;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub type Orchestrator = SessionOrchestrator<SqliteStore, HttpTransport>;

const IMPORT_PAGE_SIZE: usize = 50;
const IMPORT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Sync the catalog from a JSON array of tracks
pub async fn import(orchestrator: &Orchestrator, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let tracks: Vec<Track> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of tracks", path.display()))?;

    let source = StaticCatalog::new(tracks, IMPORT_PAGE_SIZE);
    let catalog = fetch_catalog_with_progress(&source, IMPORT_PAGE_DELAY, |p: &FetchProgress| {
        info!("{}", format_progress(p));
    })
    .await?;
    let installed = orchestrator.set_catalog(catalog).await?;

    println!("Imported {} tracks", installed);
    queue(orchestrator).await
}

pub async fn queue(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let entries = orchestrator.snapshot().await?;
    if entries.is_empty() {
        println!("Queue is empty (import a catalog first)");
    } else {
        print!("{}", format_snapshot(&entries));
    }
    Ok(())
}

pub async fn play(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let track = orchestrator.play_current().await?;
    println!("Now playing: {}", describe(&track));
    Ok(())
}

pub async fn next(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let track = orchestrator.next().await?;
    println!("Now playing: {}", describe(&track));
    Ok(())
}

pub async fn previous(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let track = orchestrator.previous().await?;
    println!("Now playing: {}", describe(&track));
    Ok(())
}

pub async fn jump(orchestrator: &Orchestrator, position: i32) -> anyhow::Result<()> {
    let track = orchestrator.jump_to(position).await?;
    println!("Now playing: {}", describe(&track));
    Ok(())
}

pub async fn pause(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    orchestrator.pause().await?;
    println!("Paused");
    Ok(())
}

pub async fn resume(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    orchestrator.resume().await?;
    println!("Resumed");
    Ok(())
}

pub async fn shuffle(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    orchestrator.shuffle_upcoming().await?;
    queue(orchestrator).await
}

pub async fn history(orchestrator: &Orchestrator, limit: usize) -> anyhow::Result<()> {
    let entries = orchestrator.ledger().recent_history(limit).await;
    if entries.is_empty() {
        println!("No playback history");
        return Ok(());
    }

    let catalog = orchestrator.catalog().await;
    let titles: HashMap<&TrackId, &Track> = catalog.iter().map(|t| (&t.id, t)).collect();
    print!("{}", format_history(&entries, &titles));
    Ok(())
}

pub async fn stats(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let summary = orchestrator.ledger().summary().await;
    print!("{}", format_summary(&summary));
    Ok(())
}

pub async fn search(orchestrator: &Orchestrator, query: &str, limit: usize) -> anyhow::Result<()> {
    let found = orchestrator.search(query).await?;
    if found.is_empty() {
        println!("No tracks match \"{}\"", query);
        return Ok(());
    }

    for track in found.iter().take(limit) {
        println!("{}  {}", track.id, describe(track));
    }
    if found.len() > limit {
        println!("... and {} more", found.len() - limit);
    }
    Ok(())
}

pub async fn catalog(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let summary = orchestrator.catalog_summary().await?;
    if summary.is_empty() {
        println!("Catalog is empty (import a catalog first)");
    } else {
        print!("{}", format_catalog_summary(&summary));
    }
    Ok(())
}

/// Follow the remote player until Ctrl-C or until reconnecting gives up
pub async fn watch(orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let mut events = orchestrator.subscribe();
    let cancel = CancellationToken::new();
    let mut sync = orchestrator.start_state_sync(cancel.clone());

    info!("Watching player state (Ctrl-C to stop)");

    let finished = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break false;
            }
            result = &mut sync => {
                result?;
                break true;
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event output fell behind"),
                Err(RecvError::Closed) => break false,
            },
        }
    };

    if finished {
        while let Ok(event) = events.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
    } else {
        cancel.cancel();
        sync.await?;
    }

    orchestrator.shutdown().await;
    info!("Stopped watching");
    Ok(())
}

fn describe(track: &Track) -> String {
    if track.artist.is_empty() {
        track.title.clone()
    } else {
        format!("{} - {}", track.title, track.artist)
    }
}

fn format_snapshot(entries: &[SnapshotEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let marker = if entry.position == 0 { ">" } else { " " };
        let _ = writeln!(
            out,
            "{} {:>4}  {}  (plays: {})",
            marker,
            entry.position,
            describe(&entry.track),
            entry.play_count
        );
    }
    out
}

fn format_history(entries: &[HistoryEntry], tracks: &HashMap<&TrackId, &Track>) -> String {
    let mut out = String::new();
    for entry in entries {
        let name = tracks
            .get(&entry.track_id)
            .map_or_else(|| entry.track_id.to_string(), |t| describe(t));
        let kind = if entry.was_skipped { "skipped" } else { "played " };
        let _ = write!(
            out,
            "{}  {}  {}",
            entry.played_at.format("%Y-%m-%d %H:%M:%S"),
            kind,
            name
        );
        if let Some(position_ms) = entry.playback_position_ms {
            let _ = write!(out, " at {}s", position_ms / 1000);
        }
        out.push('\n');
    }
    out
}

fn format_summary(summary: &StatisticsSummary) -> String {
    format!(
        "Tracks tracked: {}\nNever played:   {}\nPlay counts:    {}..={}\n",
        summary.tracked, summary.never_played, summary.min_play_count, summary.max_play_count
    )
}

fn format_catalog_summary(summary: &CatalogSummary) -> String {
    format!(
        "Tracks:         {}\nArtists:        {}\nTotal duration: {}\n",
        summary.track_count,
        summary.unique_artists,
        summary.total_duration_formatted()
    )
}

fn format_progress(progress: &FetchProgress) -> String {
    match progress.total {
        Some(total) => format!("Fetched {}/{} tracks", progress.fetched, total),
        None => format!("Fetched {} tracks", progress.fetched),
    }
}

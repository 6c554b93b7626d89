//! Audit history queries

use crate::{from_millis, to_millis};
use cadence_core::{HistoryEntry, Result, TrackId};
use sqlx::{Row, SqlitePool};

pub async fn append(pool: &SqlitePool, entry: &HistoryEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playback_history (track_id, played_at, was_skipped, playback_position_ms)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(entry.track_id.as_str())
    .bind(to_millis(entry.played_at))
    .bind(entry.was_skipped)
    .bind(entry.playback_position_ms.map(|p| p as i64))
    .execute(pool)
    .await?;

    Ok(())
}

/// Keep only the `keep` newest entries
pub async fn trim_to(pool: &SqlitePool, keep: usize) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM playback_history
        WHERE id NOT IN (
            SELECT id FROM playback_history ORDER BY id DESC LIMIT ?
        )
        "#,
    )
    .bind(keep as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Newest entries first
pub async fn recent(pool: &SqlitePool, limit: usize) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT track_id, played_at, was_skipped, playback_position_ms
        FROM playback_history
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let position: Option<i64> = row.try_get("playback_position_ms")?;
        entries.push(HistoryEntry {
            track_id: TrackId::new(row.try_get::<String, _>("track_id")?),
            played_at: from_millis(row.try_get("played_at")?)?,
            was_skipped: row.try_get("was_skipped")?,
            playback_position_ms: position.map(|p| p.max(0) as u64),
        });
    }

    Ok(entries)
}

pub async fn clear(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM playback_history")
        .execute(pool)
        .await?;
    Ok(())
}

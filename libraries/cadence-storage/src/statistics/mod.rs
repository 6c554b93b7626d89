//! Play statistics queries

use crate::{from_millis, to_millis};
use cadence_core::{Result, TrackId, TrackStatistics};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};

const ID_CHUNK: usize = 500;

fn row_to_statistics(row: &SqliteRow) -> Result<TrackStatistics> {
    let last_activity: Option<i64> = row.try_get("last_activity_at")?;
    Ok(TrackStatistics {
        track_id: TrackId::new(row.try_get::<String, _>("track_id")?),
        play_count: row.try_get::<i64, _>("play_count")?.max(0) as u64,
        last_activity_at: last_activity.map(from_millis).transpose()?,
    })
}

/// Create zero-count rows for tracks without statistics
pub async fn seed(pool: &SqlitePool, ids: &[TrackId]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut created = 0;

    for id in ids {
        let result = sqlx::query(
            "INSERT INTO track_statistics (track_id, play_count) VALUES (?, 0) \
             ON CONFLICT(track_id) DO NOTHING",
        )
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;
        created += result.rows_affected() as usize;
    }

    tx.commit().await?;
    Ok(created)
}

/// Add `delta` to every known track in one transaction
pub async fn increment(
    pool: &SqlitePool,
    ids: &[TrackId],
    delta: u64,
    at: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let at = to_millis(at);

    for id in ids {
        sqlx::query(
            r#"
            UPDATE track_statistics
            SET play_count = play_count + ?,
                last_activity_at = ?
            WHERE track_id = ?
            "#,
        )
        .bind(delta as i64)
        .bind(at)
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Least-played track IDs, never-played before played-longest-ago
///
/// Over-fetches by `exclude.len()` and filters in memory.
pub async fn least_played(
    pool: &SqlitePool,
    limit: usize,
    exclude: &HashSet<TrackId>,
) -> Result<Vec<TrackId>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let fetch = (limit + exclude.len()) as i64;
    let rows = sqlx::query(
        r#"
        SELECT track_id FROM track_statistics
        ORDER BY play_count ASC,
                 last_activity_at IS NOT NULL,
                 last_activity_at ASC,
                 seq ASC
        LIMIT ?
        "#,
    )
    .bind(fetch)
    .fetch_all(pool)
    .await?;

    let mut ids = Vec::with_capacity(limit);
    for row in &rows {
        let id = TrackId::new(row.try_get::<String, _>("track_id")?);
        if exclude.contains(&id) {
            continue;
        }
        ids.push(id);
        if ids.len() == limit {
            break;
        }
    }

    Ok(ids)
}

/// Play counts for the given tracks
pub async fn play_counts(pool: &SqlitePool, ids: &[TrackId]) -> Result<HashMap<TrackId, u64>> {
    let mut counts = HashMap::with_capacity(ids.len());

    for chunk in ids.chunks(ID_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT track_id, play_count, last_activity_at FROM track_statistics WHERE track_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_str().to_owned());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(pool).await?;
        for row in &rows {
            let stats = row_to_statistics(row)?;
            counts.insert(stats.track_id, stats.play_count);
        }
    }

    Ok(counts)
}

/// Statistics for one track
pub async fn get(pool: &SqlitePool, id: &TrackId) -> Result<Option<TrackStatistics>> {
    let row = sqlx::query(
        "SELECT track_id, play_count, last_activity_at FROM track_statistics WHERE track_id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_statistics).transpose()
}

/// All statistics rows in insertion order
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<TrackStatistics>> {
    let rows = sqlx::query(
        "SELECT track_id, play_count, last_activity_at FROM track_statistics ORDER BY seq ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_statistics).collect()
}

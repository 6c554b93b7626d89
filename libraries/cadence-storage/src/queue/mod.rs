//! Queue window persistence

use crate::{from_millis, to_millis};
use cadence_core::{QueueSlot, QueueWindow, Result, TrackId};
use sqlx::{Row, SqlitePool};

/// Load the persisted window
pub async fn load(pool: &SqlitePool) -> Result<QueueWindow> {
    let rows = sqlx::query(
        "SELECT position, track_id, inserted_at FROM queue_slots ORDER BY position ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut slots = Vec::with_capacity(rows.len());
    for row in &rows {
        slots.push(QueueSlot::new(
            row.try_get::<i64, _>("position")? as i32,
            TrackId::new(row.try_get::<String, _>("track_id")?),
            from_millis(row.try_get("inserted_at")?)?,
        ));
    }

    Ok(QueueWindow::new(slots))
}

/// Replace the whole window inside one transaction
///
/// Other connections keep reading the previous window until commit.
pub async fn replace(pool: &SqlitePool, window: &QueueWindow) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM queue_slots")
        .execute(&mut *tx)
        .await?;

    for slot in window.slots() {
        sqlx::query("INSERT INTO queue_slots (position, track_id, inserted_at) VALUES (?, ?, ?)")
            .bind(i64::from(slot.position))
            .bind(slot.track_id.as_str())
            .bind(to_millis(slot.inserted_at))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

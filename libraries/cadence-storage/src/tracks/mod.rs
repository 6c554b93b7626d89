//! Catalog track queries

use crate::{from_millis, to_millis};
use cadence_core::{CatalogSummary, Result, Track, TrackId};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// SQLite's bound-parameter limit is 999 on older builds
const ID_CHUNK: usize = 500;

const SELECT_COLUMNS: &str =
    "SELECT id, title, artist, album, cover_art_url, duration_ms, uri, fetched_at FROM tracks";

fn row_to_track(row: &SqliteRow) -> Result<Track> {
    let duration_ms: Option<i64> = row.try_get("duration_ms")?;
    Ok(Track {
        id: TrackId::new(row.try_get::<String, _>("id")?),
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        cover_art_url: row.try_get("cover_art_url")?,
        duration_ms: duration_ms.map(|d| d.max(0) as u64),
        uri: row.try_get("uri")?,
        fetched_at: from_millis(row.try_get("fetched_at")?)?,
    })
}

/// Insert new tracks and refresh metadata of known ones
///
/// Existing rows keep their catalog position.
pub async fn upsert_many(pool: &SqlitePool, tracks: &[Track]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for track in tracks {
        sqlx::query(
            r#"
            INSERT INTO tracks (id, title, artist, album, cover_art_url, duration_ms, uri, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                cover_art_url = excluded.cover_art_url,
                duration_ms = excluded.duration_ms,
                uri = excluded.uri,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(track.id.as_str())
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(&track.cover_art_url)
        .bind(track.duration_ms.map(|d| d as i64))
        .bind(&track.uri)
        .bind(to_millis(track.fetched_at))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Get track by ID
pub async fn get_by_id(pool: &SqlitePool, id: &TrackId) -> Result<Option<Track>> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_track).transpose()
}

/// Get tracks by ID; unknown IDs are skipped
pub async fn get_by_ids(pool: &SqlitePool, ids: &[TrackId]) -> Result<Vec<Track>> {
    let mut tracks = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(ID_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("{SELECT_COLUMNS} WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_str().to_owned());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(pool).await?;
        for row in &rows {
            tracks.push(row_to_track(row)?);
        }
    }

    Ok(tracks)
}

/// Get all tracks in catalog order
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Track>> {
    let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY seq ASC"))
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_track).collect()
}

/// Wrap `query` in `%` with its own `LIKE` wildcards escaped by a backslash
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Search tracks by title, artist, or album
pub async fn search(pool: &SqlitePool, query: &str) -> Result<Vec<Track>> {
    let pattern = like_pattern(query);

    let rows = sqlx::query(&format!(
        r"{SELECT_COLUMNS}
        WHERE title LIKE ?1 ESCAPE '\'
           OR artist LIKE ?1 ESCAPE '\'
           OR album LIKE ?1 ESCAPE '\'
        ORDER BY title ASC, seq ASC"
    ))
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_track).collect()
}

/// Aggregate counts over the catalog
pub async fn summary(pool: &SqlitePool) -> Result<CatalogSummary> {
    let row = sqlx::query(
        r"
        SELECT
            COUNT(*) AS track_count,
            COALESCE(SUM(duration_ms), 0) AS total_duration_ms,
            COUNT(DISTINCT NULLIF(artist, '')) AS unique_artists
        FROM tracks
        ",
    )
    .fetch_one(pool)
    .await?;

    Ok(CatalogSummary {
        track_count: row.try_get::<i64, _>("track_count")?.max(0) as usize,
        total_duration_ms: row.try_get::<i64, _>("total_duration_ms")?.max(0) as u64,
        unique_artists: row.try_get::<i64, _>("unique_artists")?.max(0) as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rock"), "%rock%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\d"), "%c:\\\\d%");
    }
}

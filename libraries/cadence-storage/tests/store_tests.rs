//! Integration tests for the SQLite store


use cadence_core::store::{CatalogStore, HistoryStore, QueueStore, StatisticsStore};
use cadence_core::{HistoryEntry, QueueSlot, QueueWindow, Track, TrackId};
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use test_helpers::{create_test_track, ids, TestDb};

// ===== Catalog =====

#[tokio::test]
async fn test_upsert_and_fetch_tracks() {
    let db = TestDb::new().await;
    let tracks = vec![
        create_test_track("t2", "Second"),
        create_test_track("t1", "First"),
    ];
    db.store.upsert_tracks(&tracks).await.unwrap();

    let all = db.store.get_all_tracks().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id.as_str(), "t2", "catalog order follows insertion");
    assert_eq!(all[0].duration_ms, Some(180_000));
    assert_eq!(all[0].artist, "Test Artist");

    let one = db.store.get_track(&TrackId::new("t1")).await.unwrap().unwrap();
    assert_eq!(one.title, "First");
    assert_eq!(one.uri, "remote:track:t1");

    assert!(db.store.get_track(&TrackId::new("nope")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upsert_updates_metadata_in_place() {
    let db = TestDb::new().await;
    db.store
        .upsert_tracks(&[create_test_track("a", "A"), create_test_track("b", "B")])
        .await
        .unwrap();
    db.store
        .upsert_tracks(&[create_test_track("a", "A (Remastered)")])
        .await
        .unwrap();

    let all = db.store.get_all_tracks().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].title, "A (Remastered)");
}

#[tokio::test]
async fn test_get_tracks_skips_unknown_ids() {
    let db = TestDb::new().await;
    db.store
        .upsert_tracks(&[create_test_track("a", "A"), create_test_track("b", "B")])
        .await
        .unwrap();

    let found = db.store.get_tracks(&ids(&["a", "missing", "b"])).await.unwrap();
    let found_ids: HashSet<&str> = found.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(found_ids, HashSet::from(["a", "b"]));
}

#[tokio::test]
async fn test_search_matches_title_artist_album() {
    let db = TestDb::new().await;
    db.store
        .upsert_tracks(&[
            Track::new("1", "Night Drive", "u:1").with_credits("Neon", "City"),
            Track::new("2", "Morning", "u:2").with_credits("The Night Shift", "Dawn"),
            Track::new("3", "Another Night", "u:3"),
            Track::new("4", "Noon", "u:4").with_credits("Sun", "Midnight Tapes"),
            Track::new("5", "Unrelated", "u:5"),
        ])
        .await
        .unwrap();

    let found = db.store.search_tracks("night").await.unwrap();
    let titles: Vec<&str> = found.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Another Night", "Morning", "Night Drive", "Noon"]);

    assert!(db.store.search_tracks("jazz").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_escapes_like_wildcards() {
    let db = TestDb::new().await;
    db.store
        .upsert_tracks(&[
            Track::new("1", "100% Pure", "u:1"),
            Track::new("2", "snake_case", "u:2"),
            Track::new("3", "Plain", "u:3"),
        ])
        .await
        .unwrap();

    let percent = db.store.search_tracks("%").await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].id.as_str(), "1");

    let underscore = db.store.search_tracks("_").await.unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].id.as_str(), "2");
}

#[tokio::test]
async fn test_catalog_summary() {
    let db = TestDb::new().await;
    assert!(db.store.catalog_summary().await.unwrap().is_empty());

    db.store
        .upsert_tracks(&[
            create_test_track("a", "A"),
            create_test_track("b", "B"),
            Track::new("c", "C", "u:c").with_credits("Other", ""),
            Track::new("d", "D", "u:d"),
        ])
        .await
        .unwrap();

    let summary = db.store.catalog_summary().await.unwrap();
    assert_eq!(summary.track_count, 4);
    assert_eq!(summary.total_duration_ms, 360_000);
    assert_eq!(summary.unique_artists, 2);
    assert_eq!(summary.total_duration_formatted(), "0h 6m");
}

// ===== Queue window =====

#[tokio::test]
async fn test_window_replace_is_whole() {
    let db = TestDb::new().await;
    let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

    let first = QueueWindow::new(vec![
        QueueSlot::new(-1, TrackId::new("a"), at),
        QueueSlot::new(0, TrackId::new("b"), at),
        QueueSlot::new(1, TrackId::new("c"), at),
    ]);
    db.store.replace_window(&first).await.unwrap();
    assert_eq!(db.store.load_window().await.unwrap(), first);

    // Same track moving to a different position must not trip the unique index
    let second = QueueWindow::new(vec![
        QueueSlot::new(-2, TrackId::new("a"), at),
        QueueSlot::new(-1, TrackId::new("b"), at),
        QueueSlot::new(0, TrackId::new("c"), at),
    ]);
    db.store.replace_window(&second).await.unwrap();
    assert_eq!(db.store.load_window().await.unwrap(), second);
}

#[tokio::test]
async fn test_empty_window_by_default() {
    let db = TestDb::new().await;
    assert!(db.store.load_window().await.unwrap().is_empty());
}

// ===== Statistics =====

#[tokio::test]
async fn test_seed_creates_missing_rows_only() {
    let db = TestDb::new().await;
    assert_eq!(db.store.seed_statistics(&ids(&["a", "b"])).await.unwrap(), 2);

    db.store.increment(&ids(&["a"]), 4, Utc::now()).await.unwrap();
    assert_eq!(db.store.seed_statistics(&ids(&["a", "b", "c"])).await.unwrap(), 1);

    let a = db.store.get_statistics(&TrackId::new("a")).await.unwrap().unwrap();
    assert_eq!(a.play_count, 4);
    assert!(a.last_activity_at.is_some());
}

#[tokio::test]
async fn test_least_played_order_and_tiebreaks() {
    let db = TestDb::new().await;
    db.store
        .seed_statistics(&ids(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();

    let now = Utc::now();
    db.store.increment(&ids(&["a"]), 1, now).await.unwrap();
    db.store
        .increment(&ids(&["b"]), 1, now - Duration::days(3))
        .await
        .unwrap();
    db.store.increment(&ids(&["c"]), 5, now).await.unwrap();

    let order = db.store.least_played(10, &HashSet::new()).await.unwrap();
    assert_eq!(order, ids(&["d", "e", "b", "a", "c"]));
}

#[tokio::test]
async fn test_least_played_respects_limit_and_exclusions() {
    let db = TestDb::new().await;
    db.store
        .seed_statistics(&ids(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();

    let exclude: HashSet<TrackId> = ids(&["a", "b"]).into_iter().collect();
    let order = db.store.least_played(2, &exclude).await.unwrap();
    assert_eq!(order, ids(&["c", "d"]));

    assert!(db.store.least_played(0, &exclude).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_increment_ignores_unknown_tracks() {
    let db = TestDb::new().await;
    db.store.seed_statistics(&ids(&["a"])).await.unwrap();
    db.store
        .increment(&ids(&["a", "ghost"]), 2, Utc::now())
        .await
        .unwrap();

    let counts = db.store.play_counts(&ids(&["a", "ghost"])).await.unwrap();
    assert_eq!(counts.get(&TrackId::new("a")), Some(&2));
    assert!(!counts.contains_key(&TrackId::new("ghost")));
    assert_eq!(db.store.all_statistics().await.unwrap().len(), 1);
}

// ===== History =====

#[tokio::test]
async fn test_history_append_trim_and_clear() {
    let db = TestDb::new().await;
    let now = Utc::now();

    for i in 0..25 {
        let entry = if i % 2 == 0 {
            HistoryEntry::played(TrackId::new(format!("t{i}")), now)
        } else {
            HistoryEntry::skipped(TrackId::new(format!("t{i}")), now, Some(1_000))
        };
        db.store.append_history(&entry).await.unwrap();
    }
    db.store.trim_history(20).await.unwrap();

    let recent = db.store.recent_history(100).await.unwrap();
    assert_eq!(recent.len(), 20);
    assert_eq!(recent[0].track_id.as_str(), "t24");
    assert_eq!(recent[19].track_id.as_str(), "t5");
    assert!(recent[1].was_skipped);
    assert_eq!(recent[1].playback_position_ms, Some(1_000));

    db.store.clear_history().await.unwrap();
    assert!(db.store.recent_history(100).await.unwrap().is_empty());
}

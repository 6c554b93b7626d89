//! Queue engine integration tests
//!
//! Window construction, navigation, reshuffling, and transaction behavior
//! against the in-memory store.

use cadence_core::{
    MemoryStore, QueueSlot, QueueStore, QueueWindow, StatisticsStore, Track, TrackId,
};
use cadence_playback::{PlaybackError, QueueConfig, QueueEngine, StatisticsLedger};
use chrono::Utc;
use std::sync::Arc;

// ===== Test Helpers =====

fn create_test_track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id), format!("remote:track:{}", id))
        .with_duration_ms(200_000)
}

struct Harness {
    store: Arc<MemoryStore>,
    ledger: Arc<StatisticsLedger<MemoryStore>>,
    queue: QueueEngine<MemoryStore>,
    catalog: Vec<Track>,
}

async fn harness(size: usize) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let catalog: Vec<Track> = (1..=size)
        .map(|i| create_test_track(&format!("t{}", i)))
        .collect();

    cadence_core::CatalogStore::upsert_tracks(store.as_ref(), &catalog)
        .await
        .unwrap();

    let ledger = Arc::new(StatisticsLedger::new(Arc::clone(&store)));
    let ids: Vec<TrackId> = catalog.iter().map(|t| t.id.clone()).collect();
    ledger.seed(&ids).await;

    let queue = QueueEngine::new(Arc::clone(&store), Arc::clone(&ledger), QueueConfig::default());
    Harness {
        store,
        ledger,
        queue,
        catalog,
    }
}

/// Persist a hand-built window and load it into the engine
async fn install_window(h: &Harness, layout: &[(i32, &str)]) {
    let now = Utc::now();
    let window = QueueWindow::new(
        layout
            .iter()
            .map(|(p, id)| QueueSlot::new(*p, TrackId::new(*id), now))
            .collect(),
    );
    h.store.replace_window(&window).await.unwrap();
    h.queue.load().await.unwrap();
}

async fn layout(queue: &QueueEngine<MemoryStore>) -> Vec<(i32, String)> {
    queue
        .window()
        .await
        .slots()
        .iter()
        .map(|s| (s.position, s.track_id.to_string()))
        .collect()
}

fn expected(entries: &[(i32, &str)]) -> Vec<(i32, String)> {
    entries.iter().map(|(p, id)| (*p, id.to_string())).collect()
}

// ===== Initialization Tests =====

#[tokio::test]
async fn test_initialize_fresh_catalog() {
    let h = harness(5).await;

    let current = h.queue.initialize(&h.catalog).await.unwrap();

    assert_eq!(current.id.as_str(), "t1");
    assert_eq!(
        layout(&h.queue).await,
        expected(&[(0, "t1"), (1, "t2"), (2, "t3"), (3, "t4"), (4, "t5")])
    );
}

#[tokio::test]
async fn test_initialize_prefers_least_played() {
    let h = harness(4).await;
    h.ledger
        .increment_by(&[TrackId::new("t2")], 3, Utc::now())
        .await;

    h.queue.initialize(&h.catalog).await.unwrap();

    assert_eq!(
        layout(&h.queue).await,
        expected(&[(0, "t1"), (1, "t3"), (2, "t4"), (3, "t2")])
    );
}

#[tokio::test]
async fn test_initialize_caps_upcoming() {
    let h = harness(40).await;
    h.queue.initialize(&h.catalog).await.unwrap();

    let window = h.queue.window().await;
    assert_eq!(window.upcoming().len(), 30);
    assert_eq!(window.len(), 31);
}

#[tokio::test]
async fn test_initialize_empty_catalog_fails() {
    let h = harness(0).await;
    assert!(matches!(
        h.queue.initialize(&[]).await,
        Err(PlaybackError::EmptyCatalog)
    ));
    assert!(h.queue.window().await.is_empty());
}

#[tokio::test]
async fn test_ensure_initialized_is_idempotent() {
    let h = harness(6).await;

    assert!(h.queue.ensure_initialized(&h.catalog).await.unwrap());
    let before = h.queue.snapshot().await.unwrap();

    assert!(!h.queue.ensure_initialized(&h.catalog).await.unwrap());
    let after = h.queue.snapshot().await.unwrap();

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_initialize_is_persisted() {
    let h = harness(3).await;
    h.queue.initialize(&h.catalog).await.unwrap();

    let persisted = h.store.load_window().await.unwrap();
    assert_eq!(persisted, *h.queue.window().await);
}

// ===== Navigation Tests =====

#[tokio::test]
async fn test_move_forward_rebuilds_window() {
    let h = harness(12).await;
    install_window(
        &h,
        &[
            (-2, "t1"),
            (-1, "t2"),
            (0, "t3"),
            (1, "t4"),
            (2, "t5"),
            (3, "t6"),
            (4, "t7"),
            (5, "t8"),
        ],
    )
    .await;

    let current = h.queue.move_to_position(2, &h.catalog).await.unwrap();

    assert_eq!(current.id.as_str(), "t5");
    assert_eq!(
        layout(&h.queue).await,
        expected(&[
            (-4, "t1"),
            (-3, "t2"),
            (-2, "t3"),
            (-1, "t4"),
            (0, "t5"),
            (1, "t6"),
            (2, "t7"),
            (3, "t8"),
            // Refill: least-played, excluding all eight above
            (4, "t9"),
            (5, "t10"),
            (6, "t11"),
            (7, "t12"),
        ])
    );
}

#[tokio::test]
async fn test_move_backward_keeps_forward_context() {
    let h = harness(5).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    h.queue.move_to_next(&h.catalog).await.unwrap();
    h.queue.move_to_next(&h.catalog).await.unwrap();

    let current = h.queue.move_to_previous(&h.catalog).await.unwrap();

    assert_eq!(current.id.as_str(), "t2");
    assert_eq!(
        layout(&h.queue).await,
        expected(&[(-1, "t1"), (0, "t2"), (1, "t3"), (2, "t4"), (3, "t5")])
    );
}

#[tokio::test]
async fn test_history_trimmed_to_twenty() {
    let h = harness(60).await;
    h.queue.initialize(&h.catalog).await.unwrap();

    for _ in 0..25 {
        h.queue.move_to_next(&h.catalog).await.unwrap();
    }

    let window = h.queue.window().await;
    assert_eq!(window.history().len(), 20);
    assert_eq!(window.upcoming().len(), 30);
    assert_eq!(window.current().unwrap().track_id.as_str(), "t26");
    assert_eq!(window.slot_at(-1).unwrap().track_id.as_str(), "t25");
    window.validate().unwrap();
}

#[tokio::test]
async fn test_jump_to_missing_position() {
    let h = harness(3).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    let before = layout(&h.queue).await;

    assert!(matches!(
        h.queue.jump_to(99, &h.catalog).await,
        Err(PlaybackError::NoSuchQueuePosition(99))
    ));
    assert_eq!(layout(&h.queue).await, before);
}

#[tokio::test]
async fn test_unknown_track_leaves_window_unchanged() {
    let h = harness(3).await;
    install_window(&h, &[(0, "t1"), (1, "ghost"), (2, "t2")]).await;
    let before = layout(&h.queue).await;

    match h.queue.move_to_next(&h.catalog).await {
        Err(PlaybackError::TrackNotFound(id)) => assert_eq!(id.as_str(), "ghost"),
        other => panic!("Expected TrackNotFound, got {:?}", other),
    }
    assert_eq!(layout(&h.queue).await, before);
}

#[tokio::test]
async fn test_target_resolved_from_store_when_missing_from_catalog() {
    let h = harness(4).await;
    h.queue.initialize(&h.catalog).await.unwrap();

    // Caller passes a stale catalog that lacks the target
    let stale: Vec<Track> = h.catalog.iter().take(1).cloned().collect();
    let current = h.queue.move_to_next(&stale).await.unwrap();
    assert_eq!(current.id.as_str(), "t2");
}

// ===== Shuffle Tests =====

#[tokio::test]
async fn test_shuffle_upcoming_reorders_by_play_count() {
    let h = harness(6).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    h.ledger
        .increment_by(&[TrackId::new("t2")], 5, Utc::now())
        .await;

    h.queue.shuffle_upcoming(&h.catalog).await.unwrap();

    assert_eq!(
        layout(&h.queue).await,
        expected(&[(0, "t1"), (1, "t3"), (2, "t4"), (3, "t5"), (4, "t6"), (5, "t2")])
    );
}

#[tokio::test]
async fn test_shuffle_keeps_history_and_current() {
    let h = harness(8).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    h.queue.move_to_position(2, &h.catalog).await.unwrap();
    let before = h.queue.window().await;

    h.queue.shuffle_upcoming(&h.catalog).await.unwrap();
    let after = h.queue.window().await;

    let kept = |w: &QueueWindow| -> Vec<(i32, TrackId)> {
        w.slots()
            .iter()
            .filter(|s| s.position <= 0)
            .map(|s| (s.position, s.track_id.clone()))
            .collect()
    };
    assert_eq!(kept(&before), kept(&after));
    after.validate().unwrap();
}

#[tokio::test]
async fn test_shuffle_empty_window() {
    let h = harness(3).await;
    assert!(matches!(
        h.queue.shuffle_upcoming(&h.catalog).await,
        Err(PlaybackError::QueueEmpty)
    ));
}

// ===== Snapshot Tests =====

#[tokio::test]
async fn test_snapshot_reflects_live_play_counts() {
    let h = harness(3).await;
    h.queue.initialize(&h.catalog).await.unwrap();

    h.ledger.record_play(&TrackId::new("t1"), Utc::now()).await;
    h.ledger
        .record_skip(&TrackId::new("t3"), Utc::now())
        .await;

    let snapshot = h.queue.snapshot().await.unwrap();
    let counts: Vec<(i32, &str, u64)> = snapshot
        .iter()
        .map(|e| (e.position, e.track.id.as_str(), e.play_count))
        .collect();
    assert_eq!(counts, vec![(0, "t1", 1), (1, "t2", 0), (2, "t3", 2)]);
}

#[tokio::test]
async fn test_snapshot_skips_stale_slots_without_touching_window() {
    let h = harness(2).await;
    install_window(&h, &[(0, "t1"), (1, "gone"), (2, "t2")]).await;

    let snapshot = h.queue.snapshot().await.unwrap();
    let rows: Vec<(i32, &str)> = snapshot
        .iter()
        .map(|e| (e.position, e.track.id.as_str()))
        .collect();
    assert_eq!(rows, vec![(0, "t1"), (2, "t2")]);

    assert_eq!(
        layout(&h.queue).await,
        expected(&[(0, "t1"), (1, "gone"), (2, "t2")])
    );
}

#[tokio::test]
async fn test_current_track() {
    let h = harness(2).await;
    assert!(h.queue.current_track().await.unwrap().is_none());

    h.queue.initialize(&h.catalog).await.unwrap();
    let current = h.queue.current_track().await.unwrap().unwrap();
    assert_eq!(current.id.as_str(), "t1");
}

// ===== Transaction Tests =====

#[tokio::test]
async fn test_dropped_transaction_discards_stage() {
    let h = harness(5).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    let before = h.queue.window().await;

    {
        let mut txn = h.queue.begin().await;
        txn.move_to_position(2, &h.catalog).await.unwrap();
        assert!(txn.staged().is_some());
        assert_eq!(*txn.previous(), *before);
    }

    assert_eq!(*h.queue.window().await, *before);
    assert_eq!(h.store.load_window().await.unwrap(), *before);
}

#[tokio::test]
async fn test_commit_publishes_stage() {
    let h = harness(5).await;
    h.queue.initialize(&h.catalog).await.unwrap();

    let mut txn = h.queue.begin().await;
    txn.move_to_position(1, &h.catalog).await.unwrap();
    let staged = txn.staged().cloned().unwrap();
    let committed = txn.commit().await.unwrap();

    assert_eq!(*committed, staged);
    assert_eq!(*h.queue.window().await, staged);
}

#[tokio::test]
async fn test_failed_persist_publishes_nothing() {
    let h = harness(5).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    let before = h.queue.window().await;

    let mut txn = h.queue.begin().await;
    txn.move_to_position(1, &h.catalog).await.unwrap();
    h.store.set_unavailable(true);
    let result = txn.commit().await;
    h.store.set_unavailable(false);

    assert!(matches!(result, Err(PlaybackError::Storage(_))));
    assert_eq!(*h.queue.window().await, *before);
}

#[tokio::test]
async fn test_writers_are_serialized() {
    let h = Arc::new(harness(40).await);
    h.queue.initialize(&h.catalog).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            h.queue.move_to_next(&h.catalog).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let window = h.queue.window().await;
    window.validate().unwrap();
    assert_eq!(window.current().unwrap().track_id.as_str(), "t9");
    assert_eq!(window.history().len(), 8);
}

// ===== Restore Tests =====

#[tokio::test]
async fn test_load_discards_invalid_window() {
    let h = harness(3).await;
    let now = Utc::now();
    let broken = QueueWindow::new(vec![
        QueueSlot::new(1, TrackId::new("t1"), now),
        QueueSlot::new(2, TrackId::new("t1"), now),
    ]);
    h.store.replace_window(&broken).await.unwrap();

    h.queue.load().await.unwrap();
    assert!(h.queue.window().await.is_empty());
}

#[tokio::test]
async fn test_load_restores_persisted_window() {
    let h = harness(4).await;
    h.queue.initialize(&h.catalog).await.unwrap();
    h.queue.move_to_next(&h.catalog).await.unwrap();
    let saved = h.queue.window().await;

    let ledger = Arc::new(StatisticsLedger::new(Arc::clone(&h.store)));
    let restored = QueueEngine::new(Arc::clone(&h.store), ledger, QueueConfig::default());
    restored.load().await.unwrap();

    assert_eq!(*restored.window().await, *saved);
    assert_eq!(
        h.store.play_counts(&[TrackId::new("t1")]).await.unwrap()[&TrackId::new("t1")],
        0
    );
}

use eventlog_core::event::NewEvent;
use eventlog_core::retention::RetentionMode;
use eventlog_core::version::ExpectedVersion;
use eventlog_core::{Error as CoreError, GlobalPosition};
use futures::StreamExt;

mod setup;

fn order_placed(n: u32) -> NewEvent {
    NewEvent::new("OrderLinePlaced", format!("line-{n}").into_bytes())
}

#[tokio::test]
async fn append_then_read_returns_versions_in_order() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o1");
    let events: Vec<_> = (1..=3).map(order_placed).collect();

    let new_version = harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, None)
        .await
        .expect("append should succeed");
    assert_eq!(new_version, 3);

    let read_back = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");

    assert_eq!(read_back.iter().map(|e| e.version).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn optimistic_conflict_allows_exactly_one_writer() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o2");

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &[order_placed(1)], None)
        .await
        .expect("first append should succeed");

    let (first, second) = futures::join!(
        harness
            .store
            .append("orders", &stream_id, ExpectedVersion::new(1), &[order_placed(2)], None),
        harness
            .store
            .append("orders", &stream_id, ExpectedVersion::new(1), &[order_placed(2)], None),
    );

    match (first, second) {
        (Ok(_), Err(CoreError::ConcurrencyConflict(conflict))) | (Err(CoreError::ConcurrencyConflict(conflict)), Ok(_)) => {
            assert_eq!(conflict.expected, 1);
            assert_eq!(conflict.actual, 2);
        }
        other => panic!("expected exactly one success and one conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn cold_archivable_prunes_hot_events_after_archive() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o3");
    let events: Vec<_> = (1..=10).map(order_placed).collect();

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, Some(RetentionMode::ColdArchivable))
        .await
        .expect("append should succeed");

    harness
        .coordinator
        .save_snapshot_and_advance_cutoff("orders", &stream_id, 5, b"snapshot-at-5".to_vec())
        .await
        .expect("snapshot + cutoff advance should succeed");

    harness.archiver.archive(eventlog_core::cancel::Cancel::never()).await.expect("archive pass should succeed");

    let remaining = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");

    assert_eq!(remaining.iter().map(|e| e.version).collect::<Vec<_>>(), vec![6, 7, 8, 9, 10]);

    let segment_rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", harness.config.archive_segments_table()))
        .fetch_one(harness.provider.pool())
        .await
        .expect("counting archive segments should succeed");
    assert_eq!(segment_rows, 1, "exactly one archive segment should have been written");
}

#[tokio::test]
async fn full_history_preserves_hot_events_after_archive() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o4");
    let events: Vec<_> = (1..=10).map(order_placed).collect();

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, Some(RetentionMode::FullHistory))
        .await
        .expect("append should succeed");

    harness
        .coordinator
        .save_snapshot_and_advance_cutoff("orders", &stream_id, 10, b"snapshot-at-10".to_vec())
        .await
        .expect("snapshot + cutoff advance should succeed");

    harness.archiver.archive(eventlog_core::cancel::Cancel::never()).await.expect("archive pass should succeed");

    let remaining = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");

    assert_eq!(remaining.len(), 10, "FullHistory must keep every hot row after archiving");
}

#[tokio::test]
async fn hard_deletable_removes_stream_entirely() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o5");
    let events: Vec<_> = (1..=10).map(order_placed).collect();

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, Some(RetentionMode::HardDeletable))
        .await
        .expect("append should succeed");

    mark_deleted(&harness, &stream_id).await;

    harness.archiver.archive(eventlog_core::cancel::Cancel::never()).await.expect("archive pass should succeed");

    let header = harness
        .store
        .get_stream_header("orders", &stream_id)
        .await
        .expect("get_stream_header should succeed");
    assert!(header.is_none(), "hard-deleted stream header must be gone");

    let remaining = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn combined_feed_merges_cold_and_hot_in_order() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o6");
    let events: Vec<_> = (1..=10).map(order_placed).collect();

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, Some(RetentionMode::ColdArchivable))
        .await
        .expect("append should succeed");

    harness
        .coordinator
        .save_snapshot_and_advance_cutoff("orders", &stream_id, 5, b"snapshot-at-5".to_vec())
        .await
        .expect("snapshot + cutoff advance should succeed");

    harness.archiver.archive(eventlog_core::cancel::Cancel::never()).await.expect("archive pass should succeed");

    let combined: Vec<_> = harness
        .feed
        .read_all_forwards(Some(0), 500, eventlog_core::cancel::Cancel::never())
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("combined feed should not error");

    let versions: Vec<_> = combined.iter().filter(|e| e.stream_id == stream_id).map(|e| e.version).collect();
    assert_eq!(versions, (1..=10).collect::<Vec<_>>());

    let positions: Vec<GlobalPosition> = combined.iter().map(|e| e.global_position).collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(positions, sorted, "combined feed must be strictly increasing with no duplicates");
}

#[tokio::test]
async fn zero_event_append_returns_existing_version_unchanged() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o7");

    let version = harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &[order_placed(1), order_placed(2)], None)
        .await
        .expect("initial append should succeed");
    assert_eq!(version, 2);

    let unchanged = harness
        .store
        .append("orders", &stream_id, ExpectedVersion::new(2), &[], None)
        .await
        .expect("zero-event append should succeed");
    assert_eq!(unchanged, 2, "appending zero events must not bump the version");

    let events = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");
    assert_eq!(events.len(), 2, "appending zero events must not touch existing rows");
}

#[tokio::test]
async fn archive_is_idempotent_across_consecutive_passes() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o8");
    let events: Vec<_> = (1..=10).map(order_placed).collect();

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, Some(RetentionMode::ColdArchivable))
        .await
        .expect("append should succeed");

    harness
        .coordinator
        .save_snapshot_and_advance_cutoff("orders", &stream_id, 5, b"snapshot-at-5".to_vec())
        .await
        .expect("snapshot + cutoff advance should succeed");

    let first_pass = harness
        .archiver
        .archive(eventlog_core::cancel::Cancel::never())
        .await
        .expect("first archive pass should succeed");
    assert_eq!(first_pass.archived, 1);

    let segment_rows_after_first: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", harness.config.archive_segments_table()))
        .fetch_one(harness.provider.pool())
        .await
        .expect("counting archive segments should succeed");

    let second_pass = harness
        .archiver
        .archive(eventlog_core::cancel::Cancel::never())
        .await
        .expect("second archive pass should succeed");
    assert_eq!(second_pass.archived, 0, "re-running archive must not write a second segment");
    assert_eq!(second_pass.skipped, 1, "the already-archived range has nothing left below its cutoff");

    let segment_rows_after_second: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", harness.config.archive_segments_table()))
        .fetch_one(harness.provider.pool())
        .await
        .expect("counting archive segments should succeed");
    assert_eq!(segment_rows_after_first, segment_rows_after_second, "catalog state must be unchanged by the second pass");

    let remaining = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");
    assert_eq!(remaining.iter().map(|e| e.version).collect::<Vec<_>>(), vec![6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn archive_skips_streams_with_no_cutoff_set() {
    let harness = setup::harness().await;
    let stream_id = setup::unique_stream_id("o9");
    let events: Vec<_> = (1..=5).map(order_placed).collect();

    harness
        .store
        .append("orders", &stream_id, ExpectedVersion::NEW, &events, Some(RetentionMode::ColdArchivable))
        .await
        .expect("append should succeed");

    let report = harness
        .archiver
        .archive(eventlog_core::cancel::Cancel::never())
        .await
        .expect("archive pass should succeed");
    assert_eq!(report.archived, 0, "a stream with no cutoff set is never a candidate");
    assert_eq!(report.skipped, 0, "a stream with no cutoff set isn't even enumerated");

    let remaining = harness
        .store
        .read_stream("orders", &stream_id, None, 1, 100)
        .await
        .expect("read_stream should succeed");
    assert_eq!(remaining.len(), 5, "no events should be pruned without a cutoff");

    let segment_rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", harness.config.archive_segments_table()))
        .fetch_one(harness.provider.pool())
        .await
        .expect("counting archive segments should succeed");
    assert_eq!(segment_rows, 0, "no segment should have been written");
}

async fn mark_deleted(harness: &setup::Harness, stream_id: &str) {
    let table = harness.config.streams_table();
    sqlx::query(&format!("UPDATE {table} SET is_deleted = TRUE WHERE domain = $1 AND stream_id = $2"))
        .bind("orders")
        .bind(stream_id)
        .execute(harness.provider.pool())
        .await
        .expect("marking stream deleted should succeed");
}

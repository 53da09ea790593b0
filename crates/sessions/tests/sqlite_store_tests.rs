//! Integration tests for the SQLite session store.

use backlot_core::{SessionId, StudioId, UploadSession, UploaderId};
use backlot_sessions::{CompleteOutcome, SessionStore, SqliteStore, StoreError};
use bytes::Bytes;
use std::sync::Arc;
use time::OffsetDateTime;

async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("sessions.db"))
        .await
        .unwrap();
    (dir, store)
}

fn sample_session(total_size: u64, total_chunks: u32) -> UploadSession {
    UploadSession::new(
        StudioId::parse("studio-1").unwrap(),
        UploaderId::parse("uploader-1").unwrap(),
        "reel.mp4".to_string(),
        "video/mp4".to_string(),
        Some("dailies".to_string()),
        total_size,
        total_chunks,
    )
}

#[tokio::test]
async fn create_and_get_roundtrip() {
    let (_dir, store) = temp_store().await;
    let session = sample_session(15, 3);
    store.create(&session).await.unwrap();

    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.studio_id, session.studio_id);
    assert_eq!(loaded.uploader, session.uploader);
    assert_eq!(loaded.file_name, "reel.mp4");
    assert_eq!(loaded.description.as_deref(), Some("dailies"));
    assert_eq!(loaded.total_size, 15);
    assert_eq!(loaded.total_chunks, 3);
    assert!(loaded.received.is_empty());
    assert!(!loaded.completing);
    assert!(loaded.completed_at.is_none());
}

#[tokio::test]
async fn get_missing_session_is_none() {
    let (_dir, store) = temp_store().await;
    assert!(store.get(SessionId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_duplicate_ids() {
    let (_dir, store) = temp_store().await;
    let session = sample_session(15, 3);
    store.create(&session).await.unwrap();
    match store.create(&session).await {
        Err(StoreError::AlreadyExists(_)) => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn add_chunk_keeps_first_writer_bytes() {
    let (_dir, store) = temp_store().await;
    let session = sample_session(15, 3);
    store.create(&session).await.unwrap();

    let added = store
        .add_chunk(session.id, 1, Bytes::from_static(b"AAAAA"))
        .await
        .unwrap();
    assert!(!added.duplicate);
    assert_eq!(added.session.received_count(), 1);
    assert!(added.session.received.contains(&1));

    let added = store
        .add_chunk(session.id, 1, Bytes::from_static(b"BBBBB"))
        .await
        .unwrap();
    assert!(added.duplicate);
    assert_eq!(added.session.received_count(), 1);

    let chunks = store.chunk_data(session.id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(&chunks[&1][..], b"AAAAA");
}

#[tokio::test]
async fn add_chunk_to_missing_session_is_not_found() {
    let (_dir, store) = temp_store().await;
    match store
        .add_chunk(SessionId::new(), 0, Bytes::from_static(b"AAAAA"))
        .await
    {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_writes_to_distinct_indices_all_land() {
    let (_dir, store) = temp_store().await;
    let store = Arc::new(store);
    let session = sample_session(40, 8);
    store.create(&session).await.unwrap();

    let mut handles = Vec::new();
    for index in 0..8u32 {
        let store = Arc::clone(&store);
        let id = session.id;
        handles.push(tokio::spawn(async move {
            store
                .add_chunk(id, index, Bytes::from(vec![index as u8; 5]))
                .await
        }));
    }
    for handle in handles {
        let added = handle.await.unwrap().unwrap();
        assert!(!added.duplicate);
    }

    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.received_count(), 8);
    assert!(loaded.has_all_chunks());

    let chunks = store.chunk_data(session.id).await.unwrap();
    for index in 0..8u32 {
        assert_eq!(&chunks[&index][..], &[index as u8; 5][..]);
    }
}

#[tokio::test]
async fn begin_complete_admits_one_caller() {
    let (_dir, store) = temp_store().await;
    let session = sample_session(15, 3);
    store.create(&session).await.unwrap();

    match store.begin_complete(session.id).await.unwrap() {
        CompleteOutcome::Acquired(acquired) => assert!(acquired.completing),
        other => panic!("unexpected: {other:?}"),
    }
    match store.begin_complete(session.id).await.unwrap() {
        CompleteOutcome::InProgress => {}
        other => panic!("unexpected: {other:?}"),
    }

    // Aborting releases the gate for a retry.
    store.abort_complete(session.id).await.unwrap();
    match store.begin_complete(session.id).await.unwrap() {
        CompleteOutcome::Acquired(_) => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn begin_complete_on_missing_session_is_not_found() {
    let (_dir, store) = temp_store().await;
    match store.begin_complete(SessionId::new()).await.unwrap() {
        CompleteOutcome::NotFound => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn completed_sessions_are_immutable() {
    let (_dir, store) = temp_store().await;
    let session = sample_session(15, 3);
    store.create(&session).await.unwrap();
    store
        .add_chunk(session.id, 0, Bytes::from_static(b"AAAAA"))
        .await
        .unwrap();

    store.begin_complete(session.id).await.unwrap();
    store
        .finish_complete(session.id, OffsetDateTime::now_utc())
        .await
        .unwrap();

    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert!(loaded.is_completed());
    assert!(!loaded.completing);

    match store
        .add_chunk(session.id, 1, Bytes::from_static(b"BBBBB"))
        .await
    {
        Err(StoreError::Completed(_)) => {}
        other => panic!("unexpected: {other:?}"),
    }
    match store.begin_complete(session.id).await.unwrap() {
        CompleteOutcome::AlreadyCompleted => {}
        other => panic!("unexpected: {other:?}"),
    }
    match store
        .finish_complete(session.id, OffsetDateTime::now_utc())
        .await
    {
        Err(StoreError::Completed(_)) => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn delete_removes_session_and_chunks() {
    let (_dir, store) = temp_store().await;
    let session = sample_session(15, 3);
    store.create(&session).await.unwrap();
    store
        .add_chunk(session.id, 0, Bytes::from_static(b"AAAAA"))
        .await
        .unwrap();

    store.delete(session.id).await.unwrap();
    assert!(store.get(session.id).await.unwrap().is_none());
    match store.chunk_data(session.id).await {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("unexpected: {other:?}"),
    }

    // Deleting again is a no-op.
    store.delete(session.id).await.unwrap();
}

#[tokio::test]
async fn reclaimable_sessions_honor_cutoffs() {
    let (_dir, store) = temp_store().await;
    let now = OffsetDateTime::now_utc();

    // Completed long ago: reclaimable.
    let old_completed = sample_session(15, 3);
    store.create(&old_completed).await.unwrap();
    store.begin_complete(old_completed.id).await.unwrap();
    store
        .finish_complete(old_completed.id, now - time::Duration::hours(2))
        .await
        .unwrap();

    // Completed just now: kept.
    let fresh_completed = sample_session(15, 3);
    store.create(&fresh_completed).await.unwrap();
    store.begin_complete(fresh_completed.id).await.unwrap();
    store.finish_complete(fresh_completed.id, now).await.unwrap();

    // Open and fresh: kept.
    let open = sample_session(15, 3);
    store.create(&open).await.unwrap();

    // Open but created before the abandoned cutoff: reclaimable.
    let mut abandoned = sample_session(15, 3);
    abandoned.created_at = now - time::Duration::days(3);
    store.create(&abandoned).await.unwrap();

    // Mid-completion: never reclaimed, however old.
    let mut gated = sample_session(15, 3);
    gated.created_at = now - time::Duration::days(3);
    store.create(&gated).await.unwrap();
    store.begin_complete(gated.id).await.unwrap();

    let ids = store
        .reclaimable_sessions(now - time::Duration::hours(1), now - time::Duration::days(1), 100)
        .await
        .unwrap();

    assert!(ids.contains(&old_completed.id));
    assert!(ids.contains(&abandoned.id));
    assert!(!ids.contains(&fresh_completed.id));
    assert!(!ids.contains(&open.id));
    assert!(!ids.contains(&gated.id));
}

#[tokio::test]
async fn reopen_releases_stale_completion_gates() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");
    let now = OffsetDateTime::now_utc();

    let mut session = sample_session(15, 3);
    session.created_at = now - time::Duration::days(3);

    // Acquire the gate and drop the store without finishing or aborting,
    // as a crash mid-completion would.
    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        store.create(&session).await.unwrap();
        store
            .add_chunk(session.id, 0, Bytes::from_static(b"AAAAA"))
            .await
            .unwrap();
        match store.begin_complete(session.id).await.unwrap() {
            CompleteOutcome::Acquired(_) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    let store = SqliteStore::new(&db_path).await.unwrap();

    // The gate from the dead process is gone: the session is retriable
    // and visible to the reclamation sweep again.
    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert!(!loaded.completing);

    let ids = store
        .reclaimable_sessions(now - time::Duration::hours(1), now - time::Duration::days(1), 100)
        .await
        .unwrap();
    assert!(ids.contains(&session.id));

    match store.begin_complete(session.id).await.unwrap() {
        CompleteOutcome::Acquired(_) => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");
    let session = sample_session(15, 3);

    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        store.create(&session).await.unwrap();
        store
            .add_chunk(session.id, 2, Bytes::from_static(b"CCCCC"))
            .await
            .unwrap();
    }

    let store = SqliteStore::new(&db_path).await.unwrap();
    let loaded = store.get(session.id).await.unwrap().unwrap();
    assert_eq!(loaded.received_count(), 1);
    assert!(loaded.received.contains(&2));
    let chunks = store.chunk_data(session.id).await.unwrap();
    assert_eq!(&chunks[&2][..], b"CCCCC");
}

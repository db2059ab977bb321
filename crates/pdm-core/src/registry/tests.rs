//! Tests for the registry (use in-memory DB helper from db).

use std::path::Path;

use crate::registry::db::open_memory;
use crate::registry::{select_preferred, JobState, ProgressSnapshot, StatusSnapshot, DOWNLOAD_TAG};

async fn insert(db: &crate::registry::Registry, content_id: &str) -> i64 {
    db.insert_job(content_id, DOWNLOAD_TAG, 3, Path::new("/tmp/pdm/c"), "{}")
        .await
        .unwrap()
}

#[tokio::test]
async fn insert_and_read_back() {
    let db = open_memory().await.unwrap();
    let id = insert(&db, "c1").await;
    let rec = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(rec.content_id, "c1");
    assert_eq!(rec.tag, DOWNLOAD_TAG);
    assert_eq!(rec.state, JobState::Pending);
    assert_eq!(rec.total_count, 3);
    assert_eq!(rec.downloaded_count, 0);
    assert_eq!(rec.destination, Path::new("/tmp/pdm/c"));
    assert!(db.get_job(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn ids_are_monotonic_per_insert() {
    let db = open_memory().await.unwrap();
    let a = insert(&db, "c1").await;
    let b = insert(&db, "c1").await;
    assert!(b > a);
    let recs = db.jobs_for_content("c1").await.unwrap();
    assert_eq!(recs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b, a]);
}

#[tokio::test]
async fn supersede_cancels_only_active_records_of_that_content() {
    let db = open_memory().await.unwrap();
    let done = insert(&db, "c1").await;
    db.finish_succeeded(done, 3, 30).await.unwrap();
    let running = insert(&db, "c1").await;
    db.set_state_if_active(running, JobState::Running).await.unwrap();
    let other = insert(&db, "c2").await;

    assert_eq!(db.supersede_active("c1").await.unwrap(), 1);
    assert_eq!(db.get_job(done).await.unwrap().unwrap().state, JobState::Succeeded);
    assert_eq!(db.get_job(running).await.unwrap().unwrap().state, JobState::Cancelled);
    assert_eq!(db.get_job(other).await.unwrap().unwrap().state, JobState::Pending);
}

#[tokio::test]
async fn finished_records_are_not_revived() {
    let db = open_memory().await.unwrap();
    let id = insert(&db, "c1").await;
    db.supersede_active("c1").await.unwrap();
    assert!(!db.set_state_if_active(id, JobState::Running).await.unwrap());
    assert!(!db.finish_succeeded(id, 3, 10).await.unwrap());
    assert!(!db.set_failed(id, "boom").await.unwrap());
    let progress = ProgressSnapshot::new("c1", 1, 3, 10);
    assert!(!db.update_progress(id, &progress).await.unwrap());
    assert_eq!(db.get_job(id).await.unwrap().unwrap().state, JobState::Cancelled);
}

#[tokio::test]
async fn progress_and_failure_are_recorded() {
    let db = open_memory().await.unwrap();
    let id = insert(&db, "c1").await;
    db.set_state_if_active(id, JobState::Running).await.unwrap();
    db.update_progress(id, &ProgressSnapshot::new("c1", 2, 3, 200))
        .await
        .unwrap();
    db.set_attempt(id, 2).await.unwrap();
    db.set_failed(id, "HTTP 500").await.unwrap();
    let rec = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(rec.state, JobState::Failed);
    assert_eq!(rec.downloaded_count, 2);
    assert_eq!(rec.downloaded_bytes, 200);
    assert_eq!(rec.attempt, 2);
    assert_eq!(rec.error.as_deref(), Some("HTTP 500"));
}

#[tokio::test]
async fn progress_never_moves_backwards_within_a_job() {
    let db = open_memory().await.unwrap();
    let id = insert(&db, "c1").await;
    db.set_state_if_active(id, JobState::Running).await.unwrap();
    db.update_progress(id, &ProgressSnapshot::new("c1", 2, 4, 200))
        .await
        .unwrap();
    // Next attempt starts over at page 1 (skipped on disk).
    assert!(db
        .update_progress(id, &ProgressSnapshot::new("c1", 1, 4, 100))
        .await
        .unwrap());
    let rec = db.get_job(id).await.unwrap().unwrap();
    assert_eq!((rec.downloaded_count, rec.downloaded_bytes), (2, 200));

    db.update_progress(id, &ProgressSnapshot::new("c1", 3, 4, 300))
        .await
        .unwrap();
    let rec = db.get_job(id).await.unwrap().unwrap();
    assert_eq!((rec.downloaded_count, rec.downloaded_bytes), (3, 300));
}

#[tokio::test]
async fn cancel_pending_leaves_running_alone() {
    let db = open_memory().await.unwrap();
    let running = insert(&db, "c1").await;
    db.set_state_if_active(running, JobState::Running).await.unwrap();
    let pending = insert(&db, "c1").await;
    assert_eq!(db.cancel_pending("c1").await.unwrap(), 1);
    assert_eq!(db.get_job(running).await.unwrap().unwrap().state, JobState::Running);
    assert_eq!(db.get_job(pending).await.unwrap().unwrap().state, JobState::Cancelled);
}

#[tokio::test]
async fn recover_interrupted_cancels_active() {
    let db = open_memory().await.unwrap();
    let a = insert(&db, "c1").await;
    db.set_state_if_active(a, JobState::Running).await.unwrap();
    let b = insert(&db, "c2").await;
    let c = insert(&db, "c3").await;
    db.finish_succeeded(c, 3, 1).await.unwrap();
    assert_eq!(db.recover_interrupted().await.unwrap(), 2);
    assert_eq!(db.get_job(b).await.unwrap().unwrap().state, JobState::Cancelled);
    assert_eq!(db.get_job(c).await.unwrap().unwrap().state, JobState::Succeeded);
}

#[tokio::test]
async fn prune_keeps_newest_per_content_and_active() {
    let db = open_memory().await.unwrap();
    let old = insert(&db, "c1").await;
    db.set_failed(old, "x").await.unwrap();
    let newest = insert(&db, "c1").await;
    db.finish_succeeded(newest, 3, 1).await.unwrap();
    let active_old = insert(&db, "c2").await;
    let _ = insert(&db, "c2").await;

    assert_eq!(db.prune_finished().await.unwrap(), 1);
    assert!(db.get_job(old).await.unwrap().is_none());
    assert!(db.get_job(newest).await.unwrap().is_some());
    assert!(db.get_job(active_old).await.unwrap().is_some());
    assert_eq!(db.list_jobs().await.unwrap().len(), 3);
}

#[tokio::test]
async fn latest_destination_and_tag_listing() {
    let db = open_memory().await.unwrap();
    assert_eq!(db.latest_destination("c1").await.unwrap(), None);
    db.insert_job("c1", DOWNLOAD_TAG, 1, Path::new("/a"), "{}").await.unwrap();
    db.insert_job("c1", DOWNLOAD_TAG, 1, Path::new("/b"), "{}").await.unwrap();
    db.insert_job("x", "other", 1, Path::new("/x"), "{}").await.unwrap();
    assert_eq!(
        db.latest_destination("c1").await.unwrap(),
        Some(Path::new("/b").to_path_buf())
    );
    assert_eq!(db.jobs_by_tag(DOWNLOAD_TAG).await.unwrap().len(), 2);
}

#[tokio::test]
async fn status_prefers_active_over_newer_terminal() {
    let db = open_memory().await.unwrap();
    let running = insert(&db, "c1").await;
    db.set_state_if_active(running, JobState::Running).await.unwrap();
    // A later record that already failed must not hide the running one.
    let failed = insert(&db, "c1").await;
    db.set_failed(failed, "x").await.unwrap();

    let recs = db.jobs_for_content("c1").await.unwrap();
    let snap = select_preferred(&recs).map(StatusSnapshot::from).unwrap();
    assert_eq!(snap.job_id, running);
    assert_eq!(snap.state, JobState::Running);
}

#[test]
fn state_labels_and_priority() {
    assert_eq!(JobState::Succeeded.status_label(), "COMPLETED");
    assert_eq!(JobState::Pending.to_string(), "PENDING");
    assert_eq!(JobState::from_db("bogus"), JobState::Failed);
    for s in [
        JobState::Pending,
        JobState::Running,
        JobState::Succeeded,
        JobState::Failed,
        JobState::Cancelled,
    ] {
        assert_eq!(JobState::from_db(s.as_str()), s);
    }
    assert!(JobState::Running.priority() < JobState::Pending.priority());
    assert!(JobState::Failed.priority() < JobState::Cancelled.priority());
    assert!(!JobState::Cancelled.is_terminal_event());
}

#[test]
fn progress_percent_rounds() {
    assert_eq!(ProgressSnapshot::new("c", 1, 3, 0).progress_percent, 33);
    assert_eq!(ProgressSnapshot::new("c", 2, 3, 0).progress_percent, 67);
    assert_eq!(ProgressSnapshot::new("c", 3, 3, 0).progress_percent, 100);
    assert_eq!(ProgressSnapshot::new("c", 0, 0, 0).progress_percent, 0);
}

//! Postgres-backed review queue tests
//!
//! These exercise the real skip-locked dequeue and need a live database:
//!
//! ```text
//! DATABASE_URL=postgresql://localhost/warden_test cargo test -p warden-hitl -- --ignored
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use warden_core::Checkpoint;
use warden_hitl::{
    ensure_review_schema, HitlError, PgReviewRepository, ReviewCreate, ReviewStatus, ReviewStore,
};

async fn repository() -> PgReviewRepository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("database reachable");
    ensure_review_schema(&pool).await.expect("schema bootstrap");
    PgReviewRepository::new(pool)
}

fn unique(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{prefix}-{nanos:x}")
}

fn create(request_id: &str) -> ReviewCreate {
    ReviewCreate::new(
        request_id,
        Checkpoint::Input,
        "needs review",
        json!({ "user_id": "u1" }),
    )
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn test_enqueue_and_lifecycle() {
    let repo = repository().await;
    let request_id = unique("req");

    let review = repo.enqueue(create(&request_id)).await.unwrap();
    assert_eq!(review.status, ReviewStatus::Pending);
    assert_eq!(review.checkpoint, Checkpoint::Input);

    let claimed = repo
        .dequeue("alice", Duration::from_secs(300), 1)
        .await
        .unwrap();
    let ours: Vec<_> = claimed
        .iter()
        .filter(|r| r.request_id == request_id)
        .collect();
    if let Some(claimed) = ours.first() {
        assert_eq!(claimed.status, ReviewStatus::Assigned);
        assert_eq!(claimed.assigned_to.as_deref(), Some("alice"));
        assert!(claimed.locked_until.is_some());
    }

    let decided = repo
        .decide(review.id, ReviewStatus::Approved, "alice", Some("ok"))
        .await
        .unwrap();
    assert_eq!(decided.status, ReviewStatus::Approved);
    assert!(decided.decision_timestamp.is_some());

    let err = repo
        .decide(review.id, ReviewStatus::Rejected, "bob", None)
        .await
        .unwrap_err();
    assert!(matches!(err, HitlError::IllegalTransition { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn test_concurrent_dequeue_is_disjoint() {
    let repo = Arc::new(repository().await);
    let marker = unique("batch");

    let mut our_ids = HashSet::new();
    for i in 0..10 {
        let review = repo
            .enqueue(create(&format!("{marker}-{i}")))
            .await
            .unwrap();
        our_ids.insert(review.id);
    }

    let mut handles = Vec::new();
    for worker in 0..4 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            let assignee = format!("worker-{worker}");
            let claimed = repo
                .dequeue(&assignee, Duration::from_secs(300), 3)
                .await
                .unwrap();
            (assignee, claimed)
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let (assignee, claimed) = handle.await.unwrap();
        for review in claimed {
            assert_eq!(review.status, ReviewStatus::Assigned);
            assert_eq!(review.assigned_to.as_deref(), Some(assignee.as_str()));
            assert!(seen.insert(review.id), "review {} double-claimed", review.id);
        }
    }

    // Every one of our rows that was claimed went to exactly one worker;
    // rows from other test runs may also be present, which is fine.
    assert!(seen.len() <= 12);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn test_expired_rows_are_never_dequeued() {
    let repo = repository().await;
    let request_id = unique("req");

    let mut review = create(&request_id);
    review.expires_at = Some(chrono::Utc::now() - chrono::Duration::seconds(5));
    repo.enqueue(review).await.unwrap();

    let claimed = repo
        .dequeue("alice", Duration::from_secs(300), 100)
        .await
        .unwrap();
    assert!(claimed.iter().all(|r| r.request_id != request_id));
}

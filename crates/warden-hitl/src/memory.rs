//! In-memory review store
//!
//! Mirrors the Postgres repository's semantics for tests and single-process
//! demos. The store-wide mutex plays the role of the row locks: a dequeue
//! claim is atomic, so concurrent dequeuers observe disjoint sets.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::error::HitlError;
use crate::models::{Review, ReviewCreate, ReviewPatch, ReviewQuery, ReviewStatus};
use crate::store::ReviewStore;

#[derive(Default)]
struct Inner {
    next_id: i64,
    reviews: Vec<Review>,
}

/// Review store held entirely in memory
#[derive(Default)]
pub struct MemoryReviewStore {
    inner: Mutex<Inner>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reviews, regardless of status
    pub fn len(&self) -> usize {
        self.inner.lock().reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn enqueue(&self, review: ReviewCreate) -> Result<Review, HitlError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;

        let stored = Review {
            id: inner.next_id,
            request_id: review.request_id,
            trace_id: review.trace_id,
            checkpoint: review.checkpoint,
            reason: review.reason,
            context_data: review.context_data,
            prompt: review.prompt,
            response: review.response,
            status: ReviewStatus::Pending,
            priority: review.priority,
            assigned_to: None,
            locked_until: None,
            reviewed_by: None,
            review_notes: None,
            decision_timestamp: None,
            created_at: Utc::now(),
            assigned_at: None,
            expires_at: review.expires_at,
            metadata: review.metadata,
        };

        inner.reviews.push(stored.clone());
        Ok(stored)
    }

    async fn dequeue(
        &self,
        assigned_to: &str,
        lock_duration: Duration,
        limit: i64,
    ) -> Result<Vec<Review>, HitlError> {
        let now = Utc::now();
        let mut inner = self.inner.lock();

        // Claimable ids in queue order: priority descending, oldest first
        let mut candidates: Vec<(i32, chrono::DateTime<Utc>, i64)> = inner
            .reviews
            .iter()
            .filter(|r| {
                r.status == ReviewStatus::Pending
                    && r.expires_at.map_or(true, |expires| expires > now)
            })
            .map(|r| (r.priority, r.created_at, r.id))
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        let claimed_ids: Vec<i64> = candidates
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, _, id)| id)
            .collect();

        let locked_until = now
            + chrono::Duration::from_std(lock_duration)
                .map_err(|e| HitlError::InvariantViolation(e.to_string()))?;

        let mut claimed = Vec::with_capacity(claimed_ids.len());
        for review in inner.reviews.iter_mut() {
            if claimed_ids.contains(&review.id) {
                review.status = ReviewStatus::Assigned;
                review.assigned_to = Some(assigned_to.to_string());
                review.assigned_at = Some(now);
                review.locked_until = Some(locked_until);
                claimed.push(review.clone());
            }
        }

        claimed.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(claimed)
    }

    async fn get(&self, id: i64) -> Result<Option<Review>, HitlError> {
        Ok(self.inner.lock().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn update(&self, id: i64, patch: ReviewPatch) -> Result<Review, HitlError> {
        let mut inner = self.inner.lock();
        let review = inner
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(HitlError::NotFound(id))?;

        if let Some(status) = patch.status {
            review.status = status;
            if status.is_decision() {
                review.decision_timestamp = Some(Utc::now());
            }
        }
        if let Some(assigned_to) = patch.assigned_to {
            review.assigned_to = Some(assigned_to);
            review.assigned_at = Some(Utc::now());
        }
        if let Some(notes) = patch.review_notes {
            review.review_notes = Some(notes);
        }
        if let Some(metadata) = patch.metadata {
            review.metadata = metadata;
        }

        Ok(review.clone())
    }

    async fn decide(
        &self,
        id: i64,
        decision: ReviewStatus,
        reviewed_by: &str,
        notes: Option<&str>,
    ) -> Result<Review, HitlError> {
        if !decision.is_decision() {
            return Err(HitlError::InvalidDecision(decision));
        }

        let mut inner = self.inner.lock();
        let review = inner
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(HitlError::NotFound(id))?;

        if !review.status.is_decidable() {
            return Err(HitlError::IllegalTransition {
                id,
                from: review.status,
                to: decision,
            });
        }

        review.status = decision;
        review.reviewed_by = Some(reviewed_by.to_string());
        review.review_notes = notes.map(str::to_string);
        review.decision_timestamp = Some(Utc::now());
        Ok(review.clone())
    }

    async fn by_request_id(&self, request_id: &str) -> Result<Vec<Review>, HitlError> {
        let mut matches: Vec<Review> = self
            .inner
            .lock()
            .reviews
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches)
    }

    async fn by_trace_id(&self, trace_id: &str) -> Result<Vec<Review>, HitlError> {
        let mut matches: Vec<Review> = self
            .inner
            .lock()
            .reviews
            .iter()
            .filter(|r| r.trace_id.as_deref() == Some(trace_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches)
    }

    async fn query(&self, query: &ReviewQuery) -> Result<Vec<Review>, HitlError> {
        let mut matches: Vec<Review> = self
            .inner
            .lock()
            .reviews
            .iter()
            .filter(|r| {
                query.status.map_or(true, |s| r.status == s)
                    && query
                        .request_id
                        .as_deref()
                        .map_or(true, |id| r.request_id == id)
                    && query
                        .trace_id
                        .as_deref()
                        .map_or(true, |id| r.trace_id.as_deref() == Some(id))
                    && query.checkpoint.map_or(true, |c| r.checkpoint == c)
                    && query
                        .assigned_to
                        .as_deref()
                        .map_or(true, |a| r.assigned_to.as_deref() == Some(a))
                    && query.start_time.map_or(true, |t| r.created_at >= t)
                    && query.end_time.map_or(true, |t| r.created_at <= t)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let matches: Vec<Review> = match query.limit {
            Some(limit) => matches
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .collect(),
            None => matches.into_iter().skip(offset).collect(),
        };

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::Checkpoint;

    fn create(request_id: &str) -> ReviewCreate {
        ReviewCreate::new(request_id, Checkpoint::Input, "needs review", json!({}))
    }

    #[tokio::test]
    async fn test_enqueue_starts_pending_with_created_at() {
        let store = MemoryReviewStore::new();
        let review = store.enqueue(create("req-1")).await.unwrap();

        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.id, 1);
        assert!(review.assigned_to.is_none());
        assert!(review.decision_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_dequeue_empty_queue_returns_empty() {
        let store = MemoryReviewStore::new();
        let claimed = store
            .dequeue("alice", Duration::from_secs(300), 5)
            .await
            .unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn test_dequeue_claims_by_priority_then_age() {
        let store = MemoryReviewStore::new();
        store.enqueue(create("old-low")).await.unwrap();
        let mut urgent = create("urgent");
        urgent.priority = 5;
        store.enqueue(urgent).await.unwrap();

        let claimed = store
            .dequeue("alice", Duration::from_secs(300), 1)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].request_id, "urgent");
        assert_eq!(claimed[0].status, ReviewStatus::Assigned);
        assert_eq!(claimed[0].assigned_to.as_deref(), Some("alice"));
        assert!(claimed[0].locked_until.is_some());
    }

    #[tokio::test]
    async fn test_dequeue_skips_expired_rows() {
        let store = MemoryReviewStore::new();
        let mut expired = create("expired");
        expired.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        store.enqueue(expired).await.unwrap();
        store.enqueue(create("fresh")).await.unwrap();

        let claimed = store
            .dequeue("alice", Duration::from_secs(300), 10)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].request_id, "fresh");
    }

    #[tokio::test]
    async fn test_dequeued_rows_are_not_claimable_again() {
        let store = MemoryReviewStore::new();
        store.enqueue(create("req-1")).await.unwrap();

        let first = store
            .dequeue("alice", Duration::from_secs(300), 10)
            .await
            .unwrap();
        let second = store
            .dequeue("bob", Duration::from_secs(300), 10)
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_decide_rejects_non_decision_status() {
        let store = MemoryReviewStore::new();
        let review = store.enqueue(create("req-1")).await.unwrap();

        let err = store
            .decide(review.id, ReviewStatus::Expired, "alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, HitlError::InvalidDecision(_)));
    }

    #[tokio::test]
    async fn test_decide_sets_decision_fields() {
        let store = MemoryReviewStore::new();
        let review = store.enqueue(create("req-1")).await.unwrap();

        let decided = store
            .decide(review.id, ReviewStatus::Approved, "alice", Some("fine"))
            .await
            .unwrap();

        assert_eq!(decided.status, ReviewStatus::Approved);
        assert_eq!(decided.reviewed_by.as_deref(), Some("alice"));
        assert_eq!(decided.review_notes.as_deref(), Some("fine"));
        assert!(decided.decision_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_decide_twice_is_an_illegal_transition() {
        let store = MemoryReviewStore::new();
        let review = store.enqueue(create("req-1")).await.unwrap();
        store
            .decide(review.id, ReviewStatus::Approved, "alice", None)
            .await
            .unwrap();

        let err = store
            .decide(review.id, ReviewStatus::Rejected, "bob", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HitlError::IllegalTransition {
                from: ReviewStatus::Approved,
                to: ReviewStatus::Rejected,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_to_decision_status_stamps_timestamp() {
        let store = MemoryReviewStore::new();
        let review = store.enqueue(create("req-1")).await.unwrap();

        let updated = store
            .update(
                review.id,
                ReviewPatch {
                    status: Some(ReviewStatus::Rejected),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ReviewStatus::Rejected);
        assert!(updated.decision_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_review_is_not_found() {
        let store = MemoryReviewStore::new();
        let err = store.update(42, ReviewPatch::default()).await.unwrap_err();
        assert!(matches!(err, HitlError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_query_filters_and_paginates() {
        let store = MemoryReviewStore::new();
        for i in 0..5 {
            let mut review = create(&format!("req-{i}"));
            review.trace_id = Some("trace-1".to_string());
            store.enqueue(review).await.unwrap();
        }

        let all = store
            .query(&ReviewQuery::new().status(ReviewStatus::Pending))
            .await
            .unwrap();
        assert_eq!(all.len(), 5);

        let page = store
            .query(&ReviewQuery::new().paginate(2, 1))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let by_trace = store.by_trace_id("trace-1").await.unwrap();
        assert_eq!(by_trace.len(), 5);

        let none = store
            .query(&ReviewQuery::new().status(ReviewStatus::Approved))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}

//! Review store contract

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HitlError;
use crate::models::{Review, ReviewCreate, ReviewPatch, ReviewQuery, ReviewStatus};

/// Durable persistence for reviews.
///
/// Implementations must guarantee at-most-one-assignee dequeue semantics:
/// concurrent `dequeue` calls observe disjoint row sets, never block on
/// each other, and never return a row whose `expires_at` has passed. A
/// backing store that cannot provide skip-locked claims (or an equivalent)
/// is not a valid implementation.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review with `status = pending` and return the stored row
    async fn enqueue(&self, review: ReviewCreate) -> Result<Review, HitlError>;

    /// Atomically claim up to `limit` pending, unexpired reviews for
    /// `assigned_to`, ordered by priority (descending) then age (oldest
    /// first). Claimed rows move to `assigned` with `locked_until` set
    /// `lock_duration` in the future. An empty queue returns an empty list
    /// without blocking.
    async fn dequeue(
        &self,
        assigned_to: &str,
        lock_duration: Duration,
        limit: i64,
    ) -> Result<Vec<Review>, HitlError>;

    /// Fetch one review by id
    async fn get(&self, id: i64) -> Result<Option<Review>, HitlError>;

    /// Apply a partial update. A status change to `approved`/`rejected`
    /// always stamps `decision_timestamp`.
    async fn update(&self, id: i64, patch: ReviewPatch) -> Result<Review, HitlError>;

    /// Record a reviewer decision. Only `approved` and `rejected` are
    /// accepted, and only from `pending`, `assigned`, or `processing`.
    async fn decide(
        &self,
        id: i64,
        decision: ReviewStatus,
        reviewed_by: &str,
        notes: Option<&str>,
    ) -> Result<Review, HitlError>;

    /// All reviews for a request, newest first
    async fn by_request_id(&self, request_id: &str) -> Result<Vec<Review>, HitlError>;

    /// All reviews for a trace, newest first
    async fn by_trace_id(&self, trace_id: &str) -> Result<Vec<Review>, HitlError>;

    /// Filtered query ordered by priority (descending) then creation time
    /// (newest first)
    async fn query(&self, query: &ReviewQuery) -> Result<Vec<Review>, HitlError>;
}

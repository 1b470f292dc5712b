//! HITL service - business operations over the review store

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};
use warden_core::PolicyContext;

use crate::error::HitlError;
use crate::models::{Review, ReviewCreate, ReviewQuery, ReviewStatus};
use crate::store::ReviewStore;

/// Default claim duration for dequeued reviews
pub const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(300);

/// Business-layer wrapper over a [`ReviewStore`]
pub struct HitlService {
    store: Arc<dyn ReviewStore>,
}

impl HitlService {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// Escalate a request for human review and return a review id string.
    ///
    /// This never propagates a failure: when the store is unreachable it
    /// logs loudly and returns a synthetic `review_failed_<request_id>` id
    /// so the surrounding request can still report a coherent escalation.
    /// Availability is deliberately preferred over strict durability here.
    pub async fn escalate(&self, request_id: &str, ctx: &PolicyContext, reason: &str) -> String {
        match self.try_escalate(request_id, ctx, reason).await {
            Ok(review_id) => review_id.to_string(),
            Err(e) => {
                error!(
                    request_id,
                    error = %e,
                    "review escalation failed, returning synthetic id"
                );
                format!("review_failed_{request_id}")
            }
        }
    }

    async fn try_escalate(
        &self,
        request_id: &str,
        ctx: &PolicyContext,
        reason: &str,
    ) -> Result<i64, HitlError> {
        let context_data = serde_json::to_value(ctx)?;

        let mut review = ReviewCreate::new(request_id, ctx.checkpoint, reason, context_data);
        review.trace_id = ctx.trace_id().map(str::to_string);
        review.prompt = Some(ctx.prompt.clone());
        review.response = ctx.response.clone();

        let stored = self.store.enqueue(review).await?;

        info!(
            review_id = stored.id,
            request_id,
            trace_id = ?stored.trace_id,
            checkpoint = %stored.checkpoint,
            reason,
            "review enqueued"
        );
        Ok(stored.id)
    }

    /// Approve a review
    pub async fn approve(
        &self,
        review_id: i64,
        reviewed_by: &str,
        notes: Option<&str>,
    ) -> Result<Review, HitlError> {
        let review = self
            .store
            .decide(review_id, ReviewStatus::Approved, reviewed_by, notes)
            .await?;
        info!(review_id, reviewed_by, request_id = %review.request_id, "review approved");
        Ok(review)
    }

    /// Reject a review
    pub async fn reject(
        &self,
        review_id: i64,
        reviewed_by: &str,
        notes: Option<&str>,
    ) -> Result<Review, HitlError> {
        let review = self
            .store
            .decide(review_id, ReviewStatus::Rejected, reviewed_by, notes)
            .await?;
        info!(review_id, reviewed_by, request_id = %review.request_id, "review rejected");
        Ok(review)
    }

    /// Claim the next pending review(s) for a reviewer
    pub async fn dequeue_review(
        &self,
        assigned_to: &str,
        lock_duration: Duration,
        limit: i64,
    ) -> Result<Vec<Review>, HitlError> {
        let reviews = self.store.dequeue(assigned_to, lock_duration, limit).await?;
        if !reviews.is_empty() {
            info!(
                count = reviews.len(),
                assigned_to,
                review_ids = ?reviews.iter().map(|r| r.id).collect::<Vec<_>>(),
                "reviews dequeued"
            );
        }
        Ok(reviews)
    }

    /// Fetch one review by id
    pub async fn review(&self, review_id: i64) -> Result<Option<Review>, HitlError> {
        self.store.get(review_id).await
    }

    /// All reviews for a request
    pub async fn reviews_by_request_id(&self, request_id: &str) -> Result<Vec<Review>, HitlError> {
        self.store.by_request_id(request_id).await
    }

    /// All reviews for a trace
    pub async fn reviews_by_trace_id(&self, trace_id: &str) -> Result<Vec<Review>, HitlError> {
        self.store.by_trace_id(trace_id).await
    }

    /// Filtered review query
    pub async fn query_reviews(&self, query: &ReviewQuery) -> Result<Vec<Review>, HitlError> {
        self.store.query(query).await
    }

    /// Look up a prior approval that may bypass a fresh escalation.
    ///
    /// Matches the most recent `approved` review with the exact prompt
    /// text, the same user (from the stored context snapshot), and the same
    /// checkpoint, no older than `max_age_days`. Any store error yields
    /// `None`: the bypass fails closed and the request escalates normally.
    pub async fn check_approved_review(
        &self,
        prompt: &str,
        user_id: &str,
        checkpoint: warden_core::Checkpoint,
        max_age_days: i64,
    ) -> Option<Review> {
        let cutoff = Utc::now() - chrono::Duration::days(max_age_days);
        let query = ReviewQuery::new()
            .status(ReviewStatus::Approved)
            .checkpoint(checkpoint)
            .since(cutoff)
            .limit(100);

        match self.store.query(&query).await {
            Ok(reviews) => reviews.into_iter().find(|review| {
                review.prompt.as_deref() == Some(prompt)
                    && review
                        .context_data
                        .get("user_id")
                        .and_then(|v| v.as_str())
                        == Some(user_id)
            }),
            Err(e) => {
                error!(user_id, checkpoint = %checkpoint, error = %e, "bypass lookup failed");
                None
            }
        }
    }
}

//! Postgres review repository
//!
//! The dequeue claim uses `FOR UPDATE SKIP LOCKED` inside a single
//! transaction, so concurrent dequeuers observe disjoint sets without
//! blocking on each other. Lock reclamation is implicit: an `assigned` row
//! whose `locked_until` has passed is flipped back to `pending` by the
//! external reaper, at which point the `status = 'pending'` predicate makes
//! it claimable again.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use warden_core::Checkpoint;

use crate::error::HitlError;
use crate::models::{Review, ReviewCreate, ReviewPatch, ReviewQuery, ReviewStatus};
use crate::store::ReviewStore;

const REVIEW_COLUMNS: &str = "id, request_id, trace_id, checkpoint, reason, context_data, \
     prompt, response, status, priority, assigned_to, locked_until, reviewed_by, \
     review_notes, decision_timestamp, created_at, assigned_at, expires_at, metadata";

/// Create the review table and its indexes if they do not exist
pub async fn ensure_review_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hitl_reviews (
            id                 BIGSERIAL PRIMARY KEY,
            request_id         TEXT NOT NULL,
            trace_id           TEXT,
            checkpoint         TEXT NOT NULL,
            reason             TEXT NOT NULL,
            context_data       JSONB NOT NULL,
            prompt             TEXT,
            response           TEXT,
            status             TEXT NOT NULL DEFAULT 'pending',
            priority           INTEGER NOT NULL DEFAULT 0,
            assigned_to        TEXT,
            locked_until       TIMESTAMPTZ,
            reviewed_by        TEXT,
            review_notes       TEXT,
            decision_timestamp TIMESTAMPTZ,
            created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            assigned_at        TIMESTAMPTZ,
            expires_at         TIMESTAMPTZ,
            metadata           JSONB NOT NULL DEFAULT '{}'::jsonb
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Covers the dequeue scan: pending rows by priority then age
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_hitl_reviews_queue \
         ON hitl_reviews (status, priority DESC, created_at ASC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_hitl_reviews_request_id ON hitl_reviews (request_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_hitl_reviews_trace_id ON hitl_reviews (trace_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Review repository backed by Postgres
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewRepository {
    async fn enqueue(&self, review: ReviewCreate) -> Result<Review, HitlError> {
        let sql = format!(
            "INSERT INTO hitl_reviews \
                (request_id, trace_id, checkpoint, reason, context_data, prompt, response, \
                 priority, expires_at, metadata, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending') \
             RETURNING {REVIEW_COLUMNS}"
        );

        let row: ReviewRow = sqlx::query_as(&sql)
            .bind(&review.request_id)
            .bind(&review.trace_id)
            .bind(review.checkpoint.as_str())
            .bind(&review.reason)
            .bind(&review.context_data)
            .bind(&review.prompt)
            .bind(&review.response)
            .bind(review.priority)
            .bind(review.expires_at)
            .bind(&review.metadata)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(request_id = %review.request_id, error = %e, "review enqueue failed");
                e
            })?;

        row.try_into()
    }

    async fn dequeue(
        &self,
        assigned_to: &str,
        lock_duration: Duration,
        limit: i64,
    ) -> Result<Vec<Review>, HitlError> {
        let sql = format!(
            "UPDATE hitl_reviews \
             SET status = 'assigned', \
                 assigned_to = $1, \
                 assigned_at = NOW(), \
                 locked_until = NOW() + make_interval(secs => $2) \
             WHERE id IN ( \
                 SELECT id \
                 FROM hitl_reviews \
                 WHERE status = 'pending' \
                   AND (expires_at IS NULL OR expires_at > NOW()) \
                 ORDER BY priority DESC, created_at ASC \
                 LIMIT $3 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {REVIEW_COLUMNS}"
        );

        // SELECT and UPDATE travel in one transaction; the row locks taken
        // by the inner SELECT are what concurrent dequeuers skip.
        let mut tx = self.pool.begin().await?;
        let rows: Vec<ReviewRow> = sqlx::query_as(&sql)
            .bind(assigned_to)
            .bind(lock_duration.as_secs_f64())
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.into_iter().map(ReviewRow::try_into).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<Review>, HitlError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM hitl_reviews WHERE id = $1");
        let row: Option<ReviewRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(ReviewRow::try_into).transpose()
    }

    async fn update(&self, id: i64, patch: ReviewPatch) -> Result<Review, HitlError> {
        let sql = format!(
            "UPDATE hitl_reviews SET \
                 status = COALESCE($2, status), \
                 decision_timestamp = CASE \
                     WHEN $2 IN ('approved', 'rejected') THEN NOW() \
                     ELSE decision_timestamp \
                 END, \
                 assigned_to = COALESCE($3, assigned_to), \
                 assigned_at = CASE WHEN $3 IS NOT NULL THEN NOW() ELSE assigned_at END, \
                 review_notes = COALESCE($4, review_notes), \
                 metadata = COALESCE($5, metadata) \
             WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        );

        let row: Option<ReviewRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(&patch.assigned_to)
            .bind(&patch.review_notes)
            .bind(&patch.metadata)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or(HitlError::NotFound(id))?.try_into()
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

        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM hitl_reviews WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or(HitlError::NotFound(id))?;
        let current: ReviewStatus = current
            .0
            .parse()
            .map_err(HitlError::InvariantViolation)?;

        if !current.is_decidable() {
            return Err(HitlError::IllegalTransition {
                id,
                from: current,
                to: decision,
            });
        }

        let sql = format!(
            "UPDATE hitl_reviews SET \
                 status = $2, \
                 reviewed_by = $3, \
                 review_notes = $4, \
                 decision_timestamp = NOW() \
             WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row: ReviewRow = sqlx::query_as(&sql)
            .bind(id)
            .bind(decision.as_str())
            .bind(reviewed_by)
            .bind(notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn by_request_id(&self, request_id: &str) -> Result<Vec<Review>, HitlError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM hitl_reviews \
             WHERE request_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows: Vec<ReviewRow> = sqlx::query_as(&sql)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ReviewRow::try_into).collect()
    }

    async fn by_trace_id(&self, trace_id: &str) -> Result<Vec<Review>, HitlError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM hitl_reviews \
             WHERE trace_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows: Vec<ReviewRow> = sqlx::query_as(&sql)
            .bind(trace_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ReviewRow::try_into).collect()
    }

    async fn query(&self, query: &ReviewQuery) -> Result<Vec<Review>, HitlError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM hitl_reviews \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR request_id = $2) \
               AND ($3::text IS NULL OR trace_id = $3) \
               AND ($4::text IS NULL OR checkpoint = $4) \
               AND ($5::text IS NULL OR assigned_to = $5) \
               AND ($6::timestamptz IS NULL OR created_at >= $6) \
               AND ($7::timestamptz IS NULL OR created_at <= $7) \
             ORDER BY priority DESC, created_at DESC, id DESC \
             LIMIT $8 OFFSET $9"
        );

        let rows: Vec<ReviewRow> = sqlx::query_as(&sql)
            .bind(query.status.map(|s| s.as_str()))
            .bind(&query.request_id)
            .bind(&query.trace_id)
            .bind(query.checkpoint.map(|c| c.as_str()))
            .bind(&query.assigned_to)
            .bind(query.start_time)
            .bind(query.end_time)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ReviewRow::try_into).collect()
    }
}

/// Raw database row; status and checkpoint arrive as text
#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    request_id: String,
    trace_id: Option<String>,
    checkpoint: String,
    reason: String,
    context_data: serde_json::Value,
    prompt: Option<String>,
    response: Option<String>,
    status: String,
    priority: i32,
    assigned_to: Option<String>,
    locked_until: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    review_notes: Option<String>,
    decision_timestamp: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    assigned_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    metadata: serde_json::Value,
}

impl TryFrom<ReviewRow> for Review {
    type Error = HitlError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let checkpoint: Checkpoint = row
            .checkpoint
            .parse()
            .map_err(|e: warden_core::Error| HitlError::InvariantViolation(e.to_string()))?;
        let status: ReviewStatus = row.status.parse().map_err(HitlError::InvariantViolation)?;

        Ok(Review {
            id: row.id,
            request_id: row.request_id,
            trace_id: row.trace_id,
            checkpoint,
            reason: row.reason,
            context_data: row.context_data,
            prompt: row.prompt,
            response: row.response,
            status,
            priority: row.priority,
            assigned_to: row.assigned_to,
            locked_until: row.locked_until,
            reviewed_by: row.reviewed_by,
            review_notes: row.review_notes,
            decision_timestamp: row.decision_timestamp,
            created_at: row.created_at,
            assigned_at: row.assigned_at,
            expires_at: row.expires_at,
            metadata: row.metadata,
        })
    }
}

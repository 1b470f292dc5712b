//! Audit event repository - raw SQL data access

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{AuditEvent, AuditEventCreate};

/// Event types that represent policy violations
const VIOLATION_EVENT_TYPES: &[&str] = &[
    "request_blocked",
    "response_blocked",
    "request_escalated",
    "response_escalated",
];

/// Repository for audit event storage and retrieval
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one audit event
    pub async fn insert_event(&self, event: &AuditEventCreate) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (trace_id, request_id, event_type, event_data, timestamp)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(&event.trace_id)
        .bind(&event.request_id)
        .bind(&event.event_type)
        .bind(&event.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All events for a trace, oldest first
    pub async fn events_by_trace_id(&self, trace_id: &str) -> Result<Vec<AuditEvent>, sqlx::Error> {
        sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, trace_id, request_id, event_type, event_data, timestamp
            FROM audit_events
            WHERE trace_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(trace_id)
        .fetch_all(&self.pool)
        .await
    }

    /// All events for a request, oldest first
    pub async fn events_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, trace_id, request_id, event_type, event_data, timestamp
            FROM audit_events
            WHERE request_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Events whose payload names the given user, within an optional time
    /// range, newest first
    pub async fn events_by_user_id(
        &self,
        user_id: &str,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, trace_id, request_id, event_type, event_data, timestamp
            FROM audit_events
            WHERE event_data->>'user_id' = $1
              AND ($2::timestamptz IS NULL OR timestamp >= $2)
              AND ($3::timestamptz IS NULL OR timestamp <= $3)
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(start_time)
        .bind(end_time)
        .fetch_all(&self.pool)
        .await
    }

    /// Events of one type, newest first, optionally limited
    pub async fn events_by_event_type(
        &self,
        event_type: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, trace_id, request_id, event_type, event_data, timestamp
            FROM audit_events
            WHERE event_type = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Block and escalation events within an optional time range, newest
    /// first
    pub async fn policy_violations(
        &self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, trace_id, request_id, event_type, event_data, timestamp
            FROM audit_events
            WHERE event_type = ANY($1)
              AND ($2::timestamptz IS NULL OR timestamp >= $2)
              AND ($3::timestamptz IS NULL OR timestamp <= $3)
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(
            VIOLATION_EVENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
        )
        .bind(start_time)
        .bind(end_time)
        .fetch_all(&self.pool)
        .await
    }
}

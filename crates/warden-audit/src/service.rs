//! Audit service - buffered fire-and-forget writes, direct reads
//!
//! The service owns a bounded channel and a background writer task. `log`
//! never blocks and never fails from the caller's point of view: a full
//! buffer drops the event with a warning, and writer-side database failures
//! are logged and swallowed. Query operations read from Postgres directly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use warden_core::AuditSink;

use crate::models::{AuditEvent, AuditEventCreate};
use crate::repository::AuditRepository;

/// Buffered events before the sink starts dropping
const AUDIT_BUFFER_SIZE: usize = 1024;

/// Service for audit event logging and retrieval
pub struct AuditService {
    repository: Arc<AuditRepository>,
    sender: mpsc::Sender<AuditEventCreate>,
}

impl AuditService {
    /// Create the service and spawn its writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(repository: AuditRepository) -> Self {
        let repository = Arc::new(repository);
        let (sender, mut receiver) = mpsc::channel::<AuditEventCreate>(AUDIT_BUFFER_SIZE);

        let writer_repository = Arc::clone(&repository);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = writer_repository.insert_event(&event).await {
                    error!(
                        request_id = %event.request_id,
                        event_type = %event.event_type,
                        error = %e,
                        "audit event write failed"
                    );
                }
            }
            debug!("audit writer task stopped");
        });

        Self { repository, sender }
    }

    /// All events for a trace, oldest first
    pub async fn events_by_trace_id(&self, trace_id: &str) -> Result<Vec<AuditEvent>, sqlx::Error> {
        self.repository.events_by_trace_id(trace_id).await
    }

    /// All events for a request, oldest first
    pub async fn events_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        self.repository.events_by_request_id(request_id).await
    }

    /// Events naming a user in their payload, within an optional time range
    pub async fn events_by_user_id(
        &self,
        user_id: &str,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        self.repository
            .events_by_user_id(user_id, start_time, end_time)
            .await
    }

    /// Events of one type, optionally limited
    pub async fn events_by_event_type(
        &self,
        event_type: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        self.repository.events_by_event_type(event_type, limit).await
    }

    /// Block and escalation events within an optional time range
    pub async fn policy_violations(
        &self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        self.repository.policy_violations(start_time, end_time).await
    }
}

impl AuditSink for AuditService {
    fn log(&self, request_id: &str, event_type: &str, data: serde_json::Value) {
        let event = AuditEventCreate::new(request_id, event_type, data);

        if self.sender.try_send(event).is_err() {
            // Drop on overflow rather than applying backpressure; losing an
            // audit event must never fail a request.
            warn!(
                request_id,
                event_type, "audit buffer full, dropping event"
            );
        }
    }
}

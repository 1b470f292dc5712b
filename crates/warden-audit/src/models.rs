//! Audit event data contracts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An audit event as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    /// Database primary key
    pub id: i64,

    /// Trace ID for end-to-end correlation
    pub trace_id: Option<String>,

    /// Request identifier
    pub request_id: String,

    /// Type of event (e.g., "request_received", "policy_evaluated")
    pub event_type: String,

    /// Arbitrary structured event payload
    pub event_data: serde_json::Value,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,
}

/// A new audit event waiting to be written
#[derive(Debug, Clone)]
pub struct AuditEventCreate {
    pub request_id: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub trace_id: Option<String>,
}

impl AuditEventCreate {
    /// Build an event, pulling `trace_id` out of the payload when present
    pub fn new(request_id: impl Into<String>, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        let trace_id = data
            .get("trace_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Self {
            request_id: request_id.into(),
            event_type: event_type.into(),
            data,
            trace_id,
        }
    }
}

//! Audit sink contract
//!
//! Every component that emits audit events holds an `Option<Arc<dyn AuditSink>>`
//! and treats the sink as fire-and-forget: `log` never blocks the caller and
//! never fails from the caller's point of view. Losing an audit event must
//! never fail a request.

use std::sync::Arc;

/// Append-only structured event logger correlated by trace identifier.
///
/// Implementations must be non-blocking: buffer or spawn, and drop on
/// overflow rather than applying backpressure.
pub trait AuditSink: Send + Sync {
    /// Record one event for the given request.
    ///
    /// `data` is an arbitrary JSON payload; when correlation is required it
    /// carries a `trace_id` entry.
    fn log(&self, request_id: &str, event_type: &str, data: serde_json::Value);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn log(&self, request_id: &str, event_type: &str, data: serde_json::Value) {
        (**self).log(request_id, event_type, data)
    }
}

/// Sink that discards every event. Used when no audit store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn log(&self, _request_id: &str, _event_type: &str, _data: serde_json::Value) {}
}

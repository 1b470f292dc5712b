//! In-memory audit sink for tests and demo wiring

use parking_lot::Mutex;
use warden_core::AuditSink;

/// One recorded audit event
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub request_id: String,
    pub event_type: String,
    pub data: serde_json::Value,
}

/// Sink that keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Event types recorded for one request, in emission order
    pub fn event_types_for(&self, request_id: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.request_id == request_id)
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// All recorded event types, in emission order
    pub fn event_types(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Number of events recorded of the given type
    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn log(&self, request_id: &str, event_type: &str, data: serde_json::Value) {
        self.events.lock().push(RecordedEvent {
            request_id: request_id.to_string(),
            event_type: event_type.to_string(),
            data,
        });
    }
}

//! Warden Audit
//!
//! Durable, append-only audit trail for the governance gateway.
//!
//! Events are written through [`AuditService`], which implements the
//! fire-and-forget `AuditSink` contract: callers never block on the
//! database and never observe write failures. Events are buffered through a
//! bounded channel and dropped (with a warning) on overflow rather than
//! applying backpressure. Query operations read directly from Postgres.

pub mod db;
pub mod memory;
pub mod models;
pub mod repository;
pub mod service;

pub use db::{connect, ensure_audit_schema, DbConfig};
pub use memory::MemoryAuditSink;
pub use models::{AuditEvent, AuditEventCreate};
pub use repository::AuditRepository;
pub use service::AuditService;

//! Warden HITL
//!
//! Durable, concurrency-safe work queue for human review of escalated
//! requests.
//!
//! Reviews are persisted through a [`ReviewStore`]; the Postgres
//! implementation claims work with the skip-locked pattern so concurrent
//! dequeuers observe disjoint sets without blocking on each other, and an
//! in-memory implementation with identical claim semantics backs tests and
//! single-process demos. [`HitlService`] layers the business operations on
//! top: escalation (which never fails the surrounding request), decisions,
//! and the approved-review bypass lookup.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod service;
pub mod store;

pub use error::HitlError;
pub use memory::MemoryReviewStore;
pub use models::{Review, ReviewCreate, ReviewPatch, ReviewQuery, ReviewStatus};
pub use repository::{ensure_review_schema, PgReviewRepository};
pub use service::HitlService;
pub use store::ReviewStore;

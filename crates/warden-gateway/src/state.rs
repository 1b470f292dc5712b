//! Application state shared across all requests

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use warden_hitl::HitlService;

use crate::orchestrator::Orchestrator;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Dual-checkpoint request orchestrator
    pub orchestrator: Arc<Orchestrator>,

    /// Review queue operations; absent when no database is configured
    pub hitl: Option<Arc<HitlService>>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: Option<PrometheusHandle>,

    /// How long a dequeued review stays locked to its reviewer
    pub review_lock_duration: Duration,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            hitl: None,
            metrics_handle: None,
            review_lock_duration: warden_hitl::service::DEFAULT_LOCK_DURATION,
        }
    }

    pub fn with_hitl(mut self, hitl: Arc<HitlService>) -> Self {
        self.hitl = Some(hitl);
        self
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn with_review_lock_duration(mut self, duration: Duration) -> Self {
        self.review_lock_duration = duration;
        self
    }
}

//! Gateway error taxonomy
//!
//! Escalation and block failures carry typed payloads; the HTTP adapter
//! maps them to status codes without parsing message text.

use warden_core::Checkpoint;
use warden_router::RouterError;

/// Failures surfaced by the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The input checkpoint blocked the prompt; no model call was made
    #[error("Request blocked by policy: {reason}")]
    RequestBlocked { reason: String },

    /// The output checkpoint blocked the model response
    #[error("Response blocked by policy: {reason}")]
    ResponseBlocked { reason: String },

    /// The input checkpoint escalated to human review
    #[error("Request escalated for human review (ID: {review_id}): {reason}")]
    RequestEscalated { review_id: String, reason: String },

    /// The output checkpoint escalated to human review
    #[error("Response escalated for human review (ID: {review_id}): {reason}")]
    ResponseEscalated { review_id: String, reason: String },

    /// Model routing failed; carries the originating kind
    #[error(transparent)]
    Router(#[from] RouterError),
}

impl GatewayError {
    /// The checkpoint a block or escalation belongs to
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        match self {
            Self::RequestBlocked { .. } | Self::RequestEscalated { .. } => Some(Checkpoint::Input),
            Self::ResponseBlocked { .. } | Self::ResponseEscalated { .. } => {
                Some(Checkpoint::Output)
            }
            Self::Router(_) => None,
        }
    }
}

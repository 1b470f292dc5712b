//! Review queue data contracts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::Checkpoint;

/// Review queue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Waiting in the queue
    Pending,
    /// Claimed by a reviewer, lock held until `locked_until`
    Assigned,
    /// Being worked on by external reviewer tooling
    Processing,
    /// Approved by a reviewer
    Approved,
    /// Rejected by a reviewer
    Rejected,
    /// Expired before a reviewer picked it up
    Expired,
}

impl ReviewStatus {
    /// The canonical lower-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Whether a decision may be made from this state
    pub fn is_decidable(self) -> bool {
        matches!(self, Self::Pending | Self::Assigned | Self::Processing)
    }

    /// Whether this status is a reviewer decision
    pub fn is_decision(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "processing" => Ok(Self::Processing),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown review status '{other}'")),
        }
    }
}

/// A review as stored in the queue.
///
/// Serializes with camelCase keys (`requestId`, `assignedTo`, ...), the
/// convention of every body the HTTP surface emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Monotonic primary key
    pub id: i64,

    /// Request that triggered the escalation
    pub request_id: String,

    /// Trace ID for correlation
    pub trace_id: Option<String>,

    /// Checkpoint at which the escalation occurred
    pub checkpoint: Checkpoint,

    /// Policy reason for the escalation
    pub reason: String,

    /// Serialized `PolicyContext` snapshot
    pub context_data: serde_json::Value,

    /// User prompt, for quick access without unpacking the snapshot
    pub prompt: Option<String>,

    /// LLM response (output-checkpoint escalations)
    pub response: Option<String>,

    /// Current queue status
    pub status: ReviewStatus,

    /// Higher priority is dequeued first
    pub priority: i32,

    /// Reviewer currently holding the claim
    pub assigned_to: Option<String>,

    /// Claim expiry; after this the row may be reclaimed
    pub locked_until: Option<DateTime<Utc>>,

    /// Reviewer who made the decision
    pub reviewed_by: Option<String>,

    /// Notes explaining the decision
    pub review_notes: Option<String>,

    /// When the decision was made
    pub decision_timestamp: Option<DateTime<Utc>>,

    /// When the review was enqueued
    pub created_at: DateTime<Utc>,

    /// When the review was last assigned
    pub assigned_at: Option<DateTime<Utc>>,

    /// Queue expiry; expired rows are never dequeued
    pub expires_at: Option<DateTime<Utc>>,

    /// Additional metadata
    pub metadata: serde_json::Value,
}

/// Fields for enqueueing a review
#[derive(Debug, Clone)]
pub struct ReviewCreate {
    pub request_id: String,
    pub trace_id: Option<String>,
    pub checkpoint: Checkpoint,
    pub reason: String,
    pub context_data: serde_json::Value,
    pub prompt: Option<String>,
    pub response: Option<String>,
    pub priority: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

impl ReviewCreate {
    /// Create with the required fields; the rest default to empty
    pub fn new(
        request_id: impl Into<String>,
        checkpoint: Checkpoint,
        reason: impl Into<String>,
        context_data: serde_json::Value,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            trace_id: None,
            checkpoint,
            reason: reason.into(),
            context_data,
            prompt: None,
            response: None,
            priority: 0,
            expires_at: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Partial update applied to a review.
///
/// A `status` of `approved` or `rejected` always stamps
/// `decision_timestamp`; assigning a reviewer stamps `assigned_at`.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub assigned_to: Option<String>,
    pub review_notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Filters for querying reviews
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub status: Option<ReviewStatus>,
    pub request_id: Option<String>,
    pub trace_id: Option<String>,
    pub checkpoint: Option<Checkpoint>,
    pub assigned_to: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ReviewQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = Some(assigned_to.into());
        self
    }

    pub fn since(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn until(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_and_parse() {
        assert_eq!(
            serde_json::to_string(&ReviewStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            "approved".parse::<ReviewStatus>().unwrap(),
            ReviewStatus::Approved
        );
        assert!("unknown".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn test_decidable_states() {
        assert!(ReviewStatus::Pending.is_decidable());
        assert!(ReviewStatus::Assigned.is_decidable());
        assert!(ReviewStatus::Processing.is_decidable());
        assert!(!ReviewStatus::Approved.is_decidable());
        assert!(!ReviewStatus::Rejected.is_decidable());
        assert!(!ReviewStatus::Expired.is_decidable());
    }

    #[test]
    fn test_decision_states() {
        assert!(ReviewStatus::Approved.is_decision());
        assert!(ReviewStatus::Rejected.is_decision());
        assert!(!ReviewStatus::Pending.is_decision());
    }

    #[test]
    fn test_query_builder() {
        let query = ReviewQuery::new()
            .status(ReviewStatus::Pending)
            .checkpoint(Checkpoint::Input)
            .paginate(10, 20);

        assert_eq!(query.status, Some(ReviewStatus::Pending));
        assert_eq!(query.checkpoint, Some(Checkpoint::Input));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));
    }
}

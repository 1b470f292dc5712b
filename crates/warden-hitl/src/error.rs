//! Review queue error taxonomy

use crate::models::ReviewStatus;

/// Errors raised by the review store and service
#[derive(Debug, thiserror::Error)]
pub enum HitlError {
    /// No review exists with the given id
    #[error("review {0} not found")]
    NotFound(i64),

    /// A decision must be `approved` or `rejected`
    #[error("decision must be 'approved' or 'rejected', got '{0}'")]
    InvalidDecision(ReviewStatus),

    /// The review is not in a state that permits this transition
    #[error("review {id} cannot move from '{from}' to '{to}'")]
    IllegalTransition {
        id: i64,
        from: ReviewStatus,
        to: ReviewStatus,
    },

    /// The store produced a row that breaks the review data model
    #[error("review store invariant violated: {0}")]
    InvariantViolation(String),

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Context snapshot (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

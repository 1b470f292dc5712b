//! Error types for Warden

/// Result type alias using Warden's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Warden operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A policy module failed while evaluating a context
    #[error("policy '{policy}' evaluation failed: {message}")]
    PolicyEvaluation { policy: String, message: String },

    /// A policy name is already taken in the registry
    #[error("policy '{0}' is already registered")]
    DuplicateName(String),

    /// A policy name is empty or whitespace
    #[error("policy name cannot be empty")]
    InvalidName,

    /// A policy entry in the configuration document is malformed
    #[error("invalid policy configuration at index {index}: missing required '{field}' field")]
    InvalidConfig { index: usize, field: &'static str },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new policy evaluation error
    pub fn policy_evaluation(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PolicyEvaluation {
            policy: policy.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

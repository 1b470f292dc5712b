//! Router and provider error taxonomy

/// Errors raised by the model router and its providers.
///
/// `RateLimit`, `Timeout`, and `Provider` are transient and retried by the
/// router; `Auth` and `ModelNotFound` are terminal.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Provider rate limit exceeded
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// Authentication failed (invalid or missing API key)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Provider call timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other provider-side failure
    #[error("provider error: {0}")]
    Provider(String),

    /// The requested model is not supported by any available provider
    #[error("model '{model}' is not supported by any available provider (providers: {providers:?})")]
    ModelNotFound {
        model: String,
        providers: Vec<String>,
    },

    /// No usable providers survived router construction
    #[error(
        "no LLM providers available; enable the local daemon or configure \
         OPENAI_API_KEY / ANTHROPIC_API_KEY"
    )]
    NoProviders,

    /// The request failed validation before routing
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RouterError {
    /// Whether the router should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit(_) | Self::Timeout(_) | Self::Provider(_)
        )
    }
}

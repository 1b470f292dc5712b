//! Concrete model providers
//!
//! Remote HTTP providers for the OpenAI and Anthropic APIs plus a client
//! for a local model daemon. All speak the provider-neutral
//! `LlmRequest`/`LlmResponse` forms and surface failures through the typed
//! `RouterError` taxonomy.

pub mod anthropic;
pub mod local;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use local::LocalProvider;
pub use openai::OpenAiProvider;

use reqwest::StatusCode;

use crate::error::RouterError;

/// Map an HTTP error status from a provider API to a typed router error
pub(crate) fn error_from_status(provider: &str, status: StatusCode, body: &str) -> RouterError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            RouterError::RateLimit(format!("{provider} returned 429: {body}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RouterError::Auth(format!("{provider} returned {status}: {body}"))
        }
        _ => RouterError::Provider(format!("{provider} returned {status}: {body}")),
    }
}

/// Map a transport-level reqwest failure to a typed router error
pub(crate) fn error_from_transport(provider: &str, err: reqwest::Error) -> RouterError {
    if err.is_timeout() {
        RouterError::Timeout(format!("{provider} request timed out: {err}"))
    } else {
        RouterError::Provider(format!("{provider} request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_from_status("openai", StatusCode::TOO_MANY_REQUESTS, ""),
            RouterError::RateLimit(_)
        ));
        assert!(matches!(
            error_from_status("openai", StatusCode::UNAUTHORIZED, ""),
            RouterError::Auth(_)
        ));
        assert!(matches!(
            error_from_status("openai", StatusCode::FORBIDDEN, ""),
            RouterError::Auth(_)
        ));
        assert!(matches!(
            error_from_status("openai", StatusCode::BAD_GATEWAY, ""),
            RouterError::Provider(_)
        ));
    }
}

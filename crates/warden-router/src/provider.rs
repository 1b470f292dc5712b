//! Model provider contract

use async_trait::async_trait;
use warden_core::{LlmRequest, LlmResponse};

use crate::error::RouterError;

/// Contract implemented by every LLM backend.
///
/// The router works with any provider uniformly through this interface.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai", "anthropic", "local")
    fn name(&self) -> &str;

    /// Whether this provider can serve the given model.
    ///
    /// This is a cheap capability query; the router may call it many times
    /// and it must not perform I/O.
    fn supports_model(&self, model: &str) -> bool;

    /// Generate a completion for the request.
    ///
    /// The router guarantees `request.model` is set before calling.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, RouterError>;

    /// Models this provider currently advertises. Providers backed by a
    /// live daemon refresh the list on a best-effort basis.
    async fn supported_models(&self) -> Vec<String>;
}

//! Warden Model Router
//!
//! Routes provider-neutral LLM requests to the appropriate backend.
//!
//! Providers implement [`ModelProvider`]; the [`ModelRouter`] selects the
//! first configured provider that supports the requested model, retries
//! transient failures up to a configured budget, and falls back to a
//! secondary model when the primary is exhausted. Responses are stamped
//! with routing metadata so callers can see how their request was served.

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod router;

pub use config::{load_router_config, RouterConfig};
pub use error::RouterError;
pub use provider::ModelProvider;
pub use providers::{AnthropicProvider, LocalProvider, OpenAiProvider};
pub use router::ModelRouter;

//! Model router configuration
//!
//! Loaded from the `model_router:` section of the gateway configuration
//! document. API credentials are never written in the document; they come
//! from the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};
use warden_core::{Error, Result};

/// Configuration for the model router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Model used when a request does not name one
    pub default_model: String,

    /// Model to fall back to when the primary is exhausted
    #[serde(default)]
    pub fallback_model: Option<String>,

    /// Per-call timeout applied to every provider client
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    /// Maximum retry attempts on transient failures (total attempts = retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether to route local model names to the local daemon
    #[serde(default = "default_true")]
    pub use_local_daemon: bool,

    /// Base URL of the local model daemon
    #[serde(default = "default_local_daemon_base_url")]
    pub local_daemon_base_url: String,

    /// OpenAI API key (from env: OPENAI_API_KEY)
    #[serde(skip)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key (from env: ANTHROPIC_API_KEY)
    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3".to_string(),
            fallback_model: None,
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            use_local_daemon: default_true(),
            local_daemon_base_url: default_local_daemon_base_url(),
            openai_api_key: None,
            anthropic_api_key: None,
        }
    }
}

impl RouterConfig {
    /// Fill provider credentials from the process environment
    pub fn with_env_credentials(mut self) -> Self {
        self.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        self.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        self
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            return Err(Error::config(
                "'default_model' is required in model_router configuration",
            ));
        }
        if self.timeout_seconds <= 0.0 {
            return Err(Error::config("'timeout_seconds' must be positive"));
        }
        Ok(())
    }
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_local_daemon_base_url() -> String {
    "http://localhost:11434".to_string()
}

/// Load the `model_router:` section from a YAML configuration file and
/// attach credentials from the environment.
pub fn load_router_config(path: impl AsRef<Path>) -> Result<RouterConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "failed to read router configuration {}: {e}",
            path.display()
        ))
    })?;

    let document: serde_yaml::Value = serde_yaml::from_str(&content)?;
    let section = document
        .get("model_router")
        .ok_or_else(|| Error::config("configuration document must contain a 'model_router' key"))?;

    let config: RouterConfig = serde_yaml::from_value(section.clone())?;
    let config = config.with_env_credentials();
    config.validate()?;
    Ok(config)
}

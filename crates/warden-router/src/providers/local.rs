//! Local model daemon provider
//!
//! Talks to an Ollama-compatible daemon. The installed-model list is
//! refreshed from the daemon on a best-effort basis; unknown model names
//! that do not belong to a remote provider are treated optimistically as
//! supported, and rejection is left to the generate call.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_core::{LlmRequest, LlmResponse, TokenUsage};

use crate::error::RouterError;
use crate::provider::ModelProvider;
use crate::providers::error_from_transport;

pub const PROVIDER_NAME: &str = "local";

/// Provider for a local model daemon
pub struct LocalProvider {
    client: reqwest::Client,
    base_url: String,
    models: RwLock<Vec<String>>,
}

impl LocalProvider {
    /// Create a provider for the daemon at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouterError::Provider(format!("failed to build local client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models: RwLock::new(Vec::new()),
        })
    }

    /// Refresh the installed-model list from the daemon. Failures leave the
    /// cached list untouched.
    async fn refresh_models(&self) {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                if let Ok(tags) = response.json::<TagsResponse>().await {
                    let names: Vec<String> =
                        tags.models.into_iter().map(|m| m.name).collect();
                    *self.models.write() = names;
                }
            }
            Ok(response) => {
                debug!(status = %response.status(), "local daemon tags query failed");
            }
            Err(e) => {
                debug!(error = %e, "local daemon unreachable while refreshing models");
            }
        }
    }
}

#[async_trait]
impl ModelProvider for LocalProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supports_model(&self, model: &str) -> bool {
        if self.models.read().iter().any(|m| m == model) {
            return true;
        }

        // Optimistic: anything that is not a remote provider's model is
        // assumed to be installed locally; generate rejects if not.
        !(model.starts_with("gpt-") || model.starts_with("claude-"))
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, RouterError> {
        let model = request
            .model
            .as_deref()
            .ok_or_else(|| RouterError::Provider("request is missing a model".into()))?;

        let prompt = request.to_simple_prompt();
        let body = GenerateRequest {
            model,
            prompt: &prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| error_from_transport(PROVIDER_NAME, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RouterError::Provider(format!(
                "local daemon does not have model '{model}' installed"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RouterError::Provider(format!(
                "local daemon returned {status}: {body}"
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            RouterError::Provider(format!("local daemon returned invalid JSON: {e}"))
        })?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        // Opportunistically refresh the model list while the daemon is known
        // to be reachable.
        self.refresh_models().await;

        Ok(into_response(model, &prompt, generated, latency_ms))
    }

    async fn supported_models(&self) -> Vec<String> {
        self.refresh_models().await;
        self.models.read().clone()
    }
}

fn into_response(
    model: &str,
    prompt: &str,
    generated: GenerateResponse,
    latency_ms: f64,
) -> LlmResponse {
    // The daemon does not report token usage in a standard form; estimate
    // from whitespace-separated words.
    let prompt_tokens = prompt.split_whitespace().count() as u32;
    let completion_tokens = generated.response.split_whitespace().count() as u32;

    let mut response = LlmResponse::new(generated.response, model, PROVIDER_NAME);
    response.finish_reason = Some("stop".to_string());
    response.usage = Some(TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    });
    response.latency_ms = Some(latency_ms);
    response
}

// =============================================================================
// Wire structures
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

//! Anthropic messages provider

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::{LlmRequest, LlmResponse, Role, TokenUsage};

use crate::error::RouterError;
use crate::provider::ModelProvider;
use crate::providers::{error_from_status, error_from_transport};

pub const PROVIDER_NAME: &str = "anthropic";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// The messages API requires max_tokens; applied when the request omits it
const DEFAULT_MAX_TOKENS: u32 = 1024;

const SUPPORTED_MODELS: &[&str] = &[
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
];

/// Provider for the Anthropic messages API
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a provider with the given API key and per-call timeout
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouterError::Provider(format!("failed to build anthropic client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supports_model(&self, model: &str) -> bool {
        SUPPORTED_MODELS.contains(&model) || model.starts_with("claude-")
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, RouterError> {
        let model = request
            .model
            .as_deref()
            .ok_or_else(|| RouterError::Provider("request is missing a model".into()))?;

        let body = build_request(model, request);

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| error_from_transport(PROVIDER_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(PROVIDER_NAME, status, &body));
        }

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RouterError::Provider(format!("anthropic returned invalid JSON: {e}")))?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        Ok(into_response(model, message, latency_ms))
    }

    async fn supported_models(&self) -> Vec<String> {
        SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect()
    }
}

/// Convert to the messages wire format: system messages become the top-level
/// `system` field, the rest keep their roles.
fn build_request<'a>(model: &'a str, request: &'a LlmRequest) -> MessagesRequest<'a> {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str());

    let messages = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect();

    MessagesRequest {
        model,
        messages,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        temperature: request.temperature,
    }
}

fn into_response(model: &str, message: MessagesResponse, latency_ms: f64) -> LlmResponse {
    let content: String = message
        .content
        .iter()
        .filter_map(|block| block.text.as_deref())
        .collect();

    let mut response = LlmResponse::new(
        content,
        message.model.unwrap_or_else(|| model.to_string()),
        PROVIDER_NAME,
    );
    response.finish_reason = message.stop_reason;
    response.usage = message.usage.map(|u| TokenUsage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.input_tokens + u.output_tokens,
    });
    response.latency_ms = Some(latency_ms);
    response
}

// =============================================================================
// Wire structures
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

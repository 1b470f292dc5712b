//! OpenAI chat completions provider

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::{LlmRequest, LlmResponse, TokenUsage};

use crate::error::RouterError;
use crate::provider::ModelProvider;
use crate::providers::{error_from_status, error_from_transport};

pub const PROVIDER_NAME: &str = "openai";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Known chat models; anything with the `gpt-` prefix is also accepted so
/// newly released models work without a code change.
const SUPPORTED_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-3.5-turbo",
];

/// Provider for the OpenAI chat completions API
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a provider with the given API key and per-call timeout
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouterError::Provider(format!("failed to build openai client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (proxies, compatible gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supports_model(&self, model: &str) -> bool {
        SUPPORTED_MODELS.contains(&model) || model.starts_with("gpt-")
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, RouterError> {
        let model = request
            .model
            .as_deref()
            .ok_or_else(|| RouterError::Provider("request is missing a model".into()))?;

        let body = ChatCompletionRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| error_from_transport(PROVIDER_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(PROVIDER_NAME, status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RouterError::Provider(format!("openai returned invalid JSON: {e}")))?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        into_response(model, completion, latency_ms)
    }

    async fn supported_models(&self) -> Vec<String> {
        SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect()
    }
}

fn into_response(
    model: &str,
    completion: ChatCompletionResponse,
    latency_ms: f64,
) -> Result<LlmResponse, RouterError> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RouterError::Provider("openai returned no choices".into()))?;

    let mut response = LlmResponse::new(
        choice.message.content.unwrap_or_default(),
        completion.model.unwrap_or_else(|| model.to_string()),
        PROVIDER_NAME,
    );
    response.finish_reason = choice.finish_reason;
    response.usage = completion.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });
    response.latency_ms = Some(latency_ms);
    Ok(response)
}

// =============================================================================
// Wire structures
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

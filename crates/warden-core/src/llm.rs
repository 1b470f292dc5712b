//! Provider-neutral LLM request and response types

use serde::{Deserialize, Serialize};

use crate::context::Metadata;
use crate::error::{Error, Result};

/// Role of a message sender in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// The canonical lower-case name (`"system"` / `"user"` / `"assistant"`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    /// Role of the message sender
    pub role: Role,

    /// Message content
    pub content: String,
}

impl LlmMessage {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Standardized request format for LLM calls.
///
/// The universal form the router accepts regardless of which provider will
/// ultimately handle the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Ordered conversation messages
    pub messages: Vec<LlmMessage>,

    /// Model identifier; when absent the router substitutes its default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Maximum tokens to generate, must be positive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// User identifier for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Additional request metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl LlmRequest {
    /// Create a request from a list of messages
    pub fn new(messages: Vec<LlmMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            user_id: None,
            metadata: Metadata::new(),
        }
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generation token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the requesting user
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Replace the metadata bag
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(Error::config("request must contain at least one message"));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::config(format!(
                    "temperature must be between 0.0 and 2.0, got {t}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(Error::config("max_tokens must be positive"));
        }
        Ok(())
    }

    /// Collapse the conversation into a single prompt string.
    ///
    /// Returns the sole user message when there is exactly one, otherwise a
    /// role-prefixed transcript. Used by the local daemon provider and for
    /// logging.
    pub fn to_simple_prompt(&self) -> String {
        let user_messages: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        if user_messages.len() == 1 && self.messages.len() == 1 {
            return user_messages[0].to_string();
        }

        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Standardized response format from LLM calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text content
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Provider that handled the request (e.g., "openai", "anthropic")
    pub provider: String,

    /// Reason for completion (e.g., "stop", "length", "content_filter")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Token usage, when the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Request latency in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,

    /// Additional response metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl LlmResponse {
    /// Create a response with the required fields
    pub fn new(
        content: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            provider: provider.into(),
            finish_reason: None,
            usage: None,
            latency_ms: None,
            metadata: Metadata::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_sane_request() {
        let req = LlmRequest::new(vec![LlmMessage::user("hi")])
            .with_temperature(0.7)
            .with_max_tokens(256);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_messages() {
        assert!(LlmRequest::new(vec![]).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let req = LlmRequest::new(vec![LlmMessage::user("hi")]).with_temperature(2.5);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let req = LlmRequest::new(vec![LlmMessage::user("hi")]).with_max_tokens(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_simple_prompt_single_user_message() {
        let req = LlmRequest::new(vec![LlmMessage::user("what is the weather?")]);
        assert_eq!(req.to_simple_prompt(), "what is the weather?");
    }

    #[test]
    fn test_simple_prompt_multi_turn_transcript() {
        let req = LlmRequest::new(vec![
            LlmMessage::system("be brief"),
            LlmMessage::user("hi"),
        ]);
        assert_eq!(req.to_simple_prompt(), "system: be brief\nuser: hi");
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }
}

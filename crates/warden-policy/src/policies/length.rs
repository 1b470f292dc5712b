//! Prompt length guard

use parking_lot::RwLock;
use warden_core::{PolicyContext, PolicyResult, Result};

use crate::module::PolicyModule;

pub const POLICY_NAME: &str = "prompt_length";

const DEFAULT_MAX_LENGTH: usize = 10_000;

/// Policy that blocks prompts exceeding a configurable maximum length
pub struct PromptLengthPolicy {
    max_length: RwLock<usize>,
}

impl PromptLengthPolicy {
    pub fn new() -> Self {
        Self {
            max_length: RwLock::new(DEFAULT_MAX_LENGTH),
        }
    }
}

impl Default for PromptLengthPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyModule for PromptLengthPolicy {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn configure(&self, options: &serde_json::Value) -> Result<()> {
        if let Some(max) = options.get("max_length").and_then(|v| v.as_u64()) {
            *self.max_length.write() = max as usize;
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &PolicyContext) -> Result<PolicyResult> {
        let max_length = *self.max_length.read();
        if ctx.prompt.chars().count() > max_length {
            return Ok(PolicyResult::block(
                POLICY_NAME,
                format!("Prompt exceeds maximum length of {max_length} characters"),
            )
            .with_confidence(1.0));
        }

        Ok(PolicyResult::allow(POLICY_NAME, "No issues detected").with_confidence(1.0))
    }
}

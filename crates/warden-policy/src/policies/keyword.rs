//! Keyword-driven escalation policy
//!
//! Escalates any request or response containing one of the configured
//! keywords to the human review queue. Useful for routing known-sensitive
//! topics to reviewers without blocking them outright.

use parking_lot::RwLock;
use warden_core::{PolicyContext, PolicyResult, Result};

use crate::module::PolicyModule;

pub const POLICY_NAME: &str = "keyword_escalation";

fn default_keywords() -> Vec<String> {
    vec!["human review".to_string(), "escalate".to_string()]
}

/// Policy that escalates on configured keyword matches
pub struct KeywordEscalationPolicy {
    keywords: RwLock<Vec<String>>,
}

impl KeywordEscalationPolicy {
    pub fn new() -> Self {
        Self {
            keywords: RwLock::new(default_keywords()),
        }
    }
}

impl Default for KeywordEscalationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyModule for KeywordEscalationPolicy {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn configure(&self, options: &serde_json::Value) -> Result<()> {
        if let Some(keywords) = options.get("keywords").and_then(|v| v.as_array()) {
            *self.keywords.write() = keywords
                .iter()
                .filter_map(|k| k.as_str())
                .map(|k| k.to_lowercase())
                .collect();
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &PolicyContext) -> Result<PolicyResult> {
        let subject = ctx.subject_text().to_lowercase();
        let matched = {
            let keywords = self.keywords.read();
            keywords.iter().find(|k| subject.contains(*k)).cloned()
        };

        if let Some(keyword) = matched {
            return Ok(PolicyResult::escalate(
                POLICY_NAME,
                format!("Content requires human review: matched keyword '{keyword}'"),
            )
            .with_confidence(0.8));
        }

        Ok(PolicyResult::allow(POLICY_NAME, "No escalation keywords matched").with_confidence(1.0))
    }
}

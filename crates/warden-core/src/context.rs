//! Policy evaluation context and result types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::outcome::{Checkpoint, PolicyOutcome};

/// Free-form key/value bag threaded through requests, responses, and contexts
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key carrying the request-global correlation identifier
pub const TRACE_ID_KEY: &str = "trace_id";

/// Universal context passed to every policy module for evaluation.
///
/// One context is built per checkpoint. Policies receive it immutably; only
/// the engine appends to `prior_outcomes` between policy runs, so the i-th
/// entry is always the outcome of the i-th policy evaluated in this pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContext {
    /// The user's prompt content
    pub prompt: String,

    /// LLM response (present only at the output checkpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Unique identifier for the user
    pub user_id: String,

    /// User's role (e.g., "trader", "analyst")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,

    /// User's email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    /// Data classification level (e.g., "public", "confidential", "restricted")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_classification: Option<String>,

    /// Customer/tenant identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    /// Industry vertical (e.g., "finance", "healthcare")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<String>,

    /// Unique request identifier for tracing
    pub request_id: String,

    /// Which checkpoint this context belongs to
    pub checkpoint: Checkpoint,

    /// Outcomes of policies already evaluated in this pass, in run order
    #[serde(default)]
    pub prior_outcomes: Vec<PolicyOutcome>,

    /// Additional context-specific metadata; carries `trace_id` when
    /// correlation is required
    #[serde(default)]
    pub metadata: Metadata,
}

impl PolicyContext {
    /// Create a context with the required fields
    pub fn new(
        prompt: impl Into<String>,
        user_id: impl Into<String>,
        request_id: impl Into<String>,
        checkpoint: Checkpoint,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response: None,
            user_id: user_id.into(),
            user_role: None,
            user_email: None,
            data_classification: None,
            customer_id: None,
            vertical: None,
            request_id: request_id.into(),
            checkpoint,
            prior_outcomes: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Attach the LLM response (output checkpoint)
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// Attach the user's role
    pub fn with_user_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    /// Attach the user's email
    pub fn with_user_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Attach prior outcomes carried over from an earlier checkpoint
    pub fn with_prior_outcomes(mut self, outcomes: Vec<PolicyOutcome>) -> Self {
        self.prior_outcomes = outcomes;
        self
    }

    /// Replace the metadata bag
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The trace identifier from the metadata bag, if present
    pub fn trace_id(&self) -> Option<&str> {
        self.metadata.get(TRACE_ID_KEY).and_then(|v| v.as_str())
    }

    /// The text under evaluation at this checkpoint: the response at the
    /// output checkpoint, the prompt otherwise.
    pub fn subject_text(&self) -> &str {
        match self.checkpoint {
            Checkpoint::Output => self.response.as_deref().unwrap_or(&self.prompt),
            Checkpoint::Input => &self.prompt,
        }
    }
}

/// One policy module's verdict on a context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    /// The policy decision
    pub outcome: PolicyOutcome,

    /// Human-readable explanation of the decision
    pub reason: String,

    /// Name of the policy that produced this result
    pub policy_name: String,

    /// Confidence of the decision, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    /// Rewritten content; meaningful only for `Redact` outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_content: Option<String>,

    /// Reversible mapping of redaction placeholder tokens to original values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redaction_tokens: Option<BTreeMap<String, String>>,
}

impl PolicyResult {
    /// Create a result with the given outcome
    pub fn new(
        outcome: PolicyOutcome,
        policy_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            outcome,
            reason: reason.into(),
            policy_name: policy_name.into(),
            confidence_score: None,
            modified_content: None,
            redaction_tokens: None,
        }
    }

    /// Create an `Allow` result
    pub fn allow(policy_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(PolicyOutcome::Allow, policy_name, reason)
    }

    /// Create a `Block` result
    pub fn block(policy_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(PolicyOutcome::Block, policy_name, reason)
    }

    /// Create an `Escalate` result
    pub fn escalate(policy_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(PolicyOutcome::Escalate, policy_name, reason)
    }

    /// Create a `Redact` result carrying the rewritten content
    pub fn redact(
        policy_name: impl Into<String>,
        reason: impl Into<String>,
        modified_content: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(PolicyOutcome::Redact, policy_name, reason);
        result.modified_content = Some(modified_content.into());
        result
    }

    /// Attach a confidence score
    pub fn with_confidence(mut self, score: f64) -> Self {
        self.confidence_score = Some(score);
        self
    }

    /// Attach the reversible redaction token mapping
    pub fn with_redaction_tokens(mut self, tokens: BTreeMap<String, String>) -> Self {
        self.redaction_tokens = Some(tokens);
        self
    }
}

/// The engine's verdict after running the full policy chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    /// Final outcome after precedence resolution
    pub final_outcome: PolicyOutcome,

    /// The result that produced the final outcome (first match in run order)
    pub final_result: PolicyResult,

    /// All individual policy results, in run order
    pub all_results: Vec<PolicyResult>,

    /// Names of the policies that were evaluated, in run order
    pub evaluated_policies: Vec<String>,

    /// Wall-clock time spent evaluating, in milliseconds
    pub evaluation_time_ms: f64,
}

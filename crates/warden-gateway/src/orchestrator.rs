//! Dual-checkpoint orchestrator
//!
//! The request state machine. No unauthorized prompt reaches a model and no
//! unauthorized model output reaches a caller: every request passes the
//! input checkpoint before routing and the output checkpoint before return.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use warden_core::{
    AuditSink, Checkpoint, LlmMessage, LlmRequest, LlmResponse, Metadata, PolicyContext,
    PolicyEvaluationResult, PolicyOutcome,
};
use warden_hitl::HitlService;
use warden_policy::PolicyEngine;
use warden_router::ModelRouter;

use crate::error::GatewayError;

/// Per-request options accepted by the orchestrator
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub prompt: String,
    pub user_id: String,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub user_role: Option<String>,
    pub user_email: Option<String>,
    pub metadata: Metadata,
}

impl ChatOptions {
    /// Create options with the required fields
    pub fn new(prompt: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            user_id: user_id.into(),
            model: None,
            temperature: None,
            max_tokens: None,
            user_role: None,
            user_email: None,
            metadata: Metadata::new(),
        }
    }
}

/// A request that passed both checkpoints
#[derive(Debug)]
pub struct Completed {
    /// Model response, already redacted when the output checkpoint asked
    pub response: LlmResponse,

    /// Input-checkpoint evaluation
    pub input_result: PolicyEvaluationResult,

    /// Output-checkpoint evaluation
    pub output_result: PolicyEvaluationResult,
}

/// Orchestrates the dual-checkpoint flow:
///
/// 1. Input checkpoint: evaluate policies on the user prompt
/// 2. If allowed (possibly redacted), route to the model
/// 3. Output checkpoint: evaluate policies on the model response
/// 4. Return the response, redacted when the final outcome asks for it
pub struct Orchestrator {
    policy_engine: Arc<PolicyEngine>,
    model_router: Arc<ModelRouter>,
    hitl: Option<Arc<HitlService>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Orchestrator {
    pub fn new(policy_engine: Arc<PolicyEngine>, model_router: Arc<ModelRouter>) -> Self {
        Self {
            policy_engine,
            model_router,
            hitl: None,
            audit: None,
        }
    }

    /// Attach the review queue used for escalations
    pub fn with_hitl(mut self, hitl: Arc<HitlService>) -> Self {
        self.hitl = Some(hitl);
        self
    }

    /// Attach an audit sink for request lifecycle events
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Process one request through the dual-checkpoint flow
    pub async fn process(&self, options: ChatOptions) -> Result<Completed, GatewayError> {
        let request_id = Uuid::new_v4().to_string();

        // Take the trace id from the caller when present, mint one
        // otherwise, and thread it through every downstream metadata bag.
        let trace_id = options
            .metadata
            .get("trace_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut metadata = options.metadata.clone();
        metadata.insert("trace_id".to_string(), trace_id.clone().into());

        info!(
            request_id,
            user_id = %options.user_id,
            prompt_length = options.prompt.len(),
            checkpoint = "input",
            "request_received"
        );
        self.audit_log(
            &request_id,
            "request_received",
            json!({
                "user_id": options.user_id,
                "prompt_length": options.prompt.len(),
                "trace_id": trace_id,
            }),
        );

        // ===== INPUT CHECKPOINT =====
        let mut input_ctx =
            PolicyContext::new(&options.prompt, &options.user_id, &request_id, Checkpoint::Input)
                .with_metadata(metadata.clone());
        input_ctx.user_role = options.user_role.clone();
        input_ctx.user_email = options.user_email.clone();

        let input_result = self.policy_engine.evaluate(&mut input_ctx);

        match input_result.final_outcome {
            PolicyOutcome::Block => {
                let reason = input_result.final_result.reason.clone();
                warn!(request_id, reason = %reason, checkpoint = "input", "request_blocked");
                self.audit_log(
                    &request_id,
                    "request_blocked",
                    json!({ "reason": reason, "trace_id": trace_id }),
                );
                return Err(GatewayError::RequestBlocked { reason });
            }
            PolicyOutcome::Escalate => {
                let reason = input_result.final_result.reason.clone();
                let review_id = self.escalate(&request_id, &input_ctx, &reason).await;
                info!(
                    request_id,
                    review_id, reason = %reason, checkpoint = "input", "request_escalated"
                );
                self.audit_log(
                    &request_id,
                    "request_escalated",
                    json!({ "review_id": review_id, "trace_id": trace_id }),
                );
                return Err(GatewayError::RequestEscalated { review_id, reason });
            }
            PolicyOutcome::Redact | PolicyOutcome::Allow => {}
        }

        let input_redacted = input_result.final_outcome == PolicyOutcome::Redact;
        // Redaction is advisory when the policy provided no content
        let prompt_to_use = match (&input_result.final_result.modified_content, input_redacted) {
            (Some(modified), true) => modified.clone(),
            _ => options.prompt.clone(),
        };

        // ===== ROUTE TO MODEL =====
        let mut request_metadata = metadata.clone();
        request_metadata.insert("request_id".to_string(), request_id.clone().into());
        request_metadata.insert("input_redacted".to_string(), input_redacted.into());

        let mut llm_request = LlmRequest::new(vec![LlmMessage::user(&prompt_to_use)])
            .with_user_id(&options.user_id)
            .with_metadata(request_metadata);
        llm_request.model = options.model.clone();
        llm_request.temperature = options.temperature;
        llm_request.max_tokens = options.max_tokens;

        let mut llm_response = match self.model_router.route(&llm_request).await {
            Ok(response) => response,
            Err(e) => {
                // The router already audited the failure
                error!(request_id, error = %e, "router_error");
                return Err(e.into());
            }
        };

        // ===== OUTPUT CHECKPOINT =====
        let mut output_metadata = metadata.clone();
        output_metadata.insert("input_redacted".to_string(), input_redacted.into());

        let mut output_ctx = PolicyContext::new(
            &prompt_to_use, // the prompt that was actually sent
            &options.user_id,
            &request_id,
            Checkpoint::Output,
        )
        .with_response(&llm_response.content)
        .with_prior_outcomes(vec![input_result.final_outcome])
        .with_metadata(output_metadata);
        output_ctx.user_role = options.user_role.clone();
        output_ctx.user_email = options.user_email.clone();

        let output_result = self.policy_engine.evaluate(&mut output_ctx);

        match output_result.final_outcome {
            PolicyOutcome::Block => {
                let reason = output_result.final_result.reason.clone();
                warn!(request_id, reason = %reason, checkpoint = "output", "response_blocked");
                self.audit_log(
                    &request_id,
                    "response_blocked",
                    json!({ "reason": reason, "trace_id": trace_id }),
                );
                return Err(GatewayError::ResponseBlocked { reason });
            }
            PolicyOutcome::Escalate => {
                let reason = output_result.final_result.reason.clone();
                let review_id = self.escalate(&request_id, &output_ctx, &reason).await;
                info!(
                    request_id,
                    review_id, reason = %reason, checkpoint = "output", "response_escalated"
                );
                self.audit_log(
                    &request_id,
                    "response_escalated",
                    json!({ "review_id": review_id, "trace_id": trace_id }),
                );
                return Err(GatewayError::ResponseEscalated { review_id, reason });
            }
            PolicyOutcome::Redact => {
                // The response content is mutated exactly once, here
                if let Some(modified) = &output_result.final_result.modified_content {
                    llm_response.content = modified.clone();
                }
            }
            PolicyOutcome::Allow => {}
        }

        let response_redacted = output_result.final_outcome == PolicyOutcome::Redact;
        info!(
            request_id,
            final_outcome = %output_result.final_outcome,
            response_redacted,
            model = %llm_response.model,
            provider = %llm_response.provider,
            "request_completed"
        );
        self.audit_log(
            &request_id,
            "request_completed",
            json!({
                "final_outcome": output_result.final_outcome,
                "response_redacted": response_redacted,
                "trace_id": trace_id,
            }),
        );

        Ok(Completed {
            response: llm_response,
            input_result,
            output_result,
        })
    }

    /// Enqueue a review; without a review queue a synthetic id is minted so
    /// callers still receive a coherent escalation.
    async fn escalate(&self, request_id: &str, ctx: &PolicyContext, reason: &str) -> String {
        match &self.hitl {
            Some(hitl) => hitl.escalate(request_id, ctx, reason).await,
            None => {
                let synthetic = format!("review_{}", &Uuid::new_v4().simple().to_string()[..8]);
                warn!(
                    request_id,
                    review_id = %synthetic,
                    "no review queue configured, escalation not persisted"
                );
                synthetic
            }
        }
    }

    fn audit_log(&self, request_id: &str, event_type: &str, data: serde_json::Value) {
        if let Some(sink) = &self.audit {
            sink.log(request_id, event_type, data);
        }
    }
}

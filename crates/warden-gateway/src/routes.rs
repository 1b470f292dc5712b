//! HTTP routes and handlers
//!
//! Thin adapter from the API surface to the orchestrator and review queue.
//! Every response carries an `X-Trace-Id` header; error bodies always
//! include the trace id so operators can join them with audit records.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;
use warden_core::{Checkpoint, LlmMessage, Metadata, PolicyOutcome, Role, TokenUsage};
use warden_hitl::{HitlError, ReviewQuery, ReviewStatus};

use crate::error::GatewayError;
use crate::orchestrator::ChatOptions;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/chat", post(chat));

    if state.hitl.is_some() {
        router = router
            .route("/api/hitl/reviews", get(list_reviews))
            .route("/api/hitl/reviews/dequeue", post(dequeue_reviews))
            .route("/api/hitl/reviews/:id", get(get_review))
            .route("/api/hitl/reviews/:id/approve", post(approve_review))
            .route("/api/hitl/reviews/:id/reject", post(reject_review));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

// =============================================================================
// Chat
// =============================================================================

/// Chat request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    messages: Vec<LlmMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

/// Successful chat response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    content: String,
    model: String,
    provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<TokenUsage>,
    policy_outcome: PolicyOutcome,
    redacted: bool,
    metadata: Metadata,
}

/// Main chat endpoint with dual-checkpoint validation
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    metrics::counter!("warden_requests_total").increment(1);

    // Trace id for end-to-end correlation, returned on every path
    let trace_id = Uuid::new_v4().to_string();

    // The prompt is the last user message
    let Some(prompt) = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
    else {
        let response = (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "request must contain at least one user message",
                "errorCode": "INVALID_REQUEST",
                "details": { "traceId": trace_id },
            })),
        )
            .into_response();
        return with_trace_id(response, &trace_id);
    };

    let user_id = request.user_id.unwrap_or_else(|| "anonymous".to_string());

    let mut metadata = request.metadata.unwrap_or_default();
    metadata.insert("trace_id".to_string(), trace_id.clone().into());

    let mut options = ChatOptions::new(prompt, &user_id);
    options.model = request.model;
    options.temperature = request.temperature;
    options.max_tokens = request.max_tokens;
    options.metadata = metadata;

    match state.orchestrator.process(options).await {
        Ok(completed) => {
            metrics::counter!(
                "warden_decisions_total",
                "outcome" => completed.output_result.final_outcome.as_str()
            )
            .increment(1);

            let mut metadata = completed.response.metadata.clone();
            metadata.insert("traceId".to_string(), trace_id.clone().into());
            metadata.insert(
                "inputPolicyOutcome".to_string(),
                completed.input_result.final_outcome.as_str().into(),
            );
            metadata.insert(
                "outputPolicyOutcome".to_string(),
                completed.output_result.final_outcome.as_str().into(),
            );
            metadata.insert(
                "policiesEvaluated".to_string(),
                completed.output_result.evaluated_policies.clone().into(),
            );

            let body = ChatResponse {
                content: completed.response.content,
                model: completed.response.model,
                provider: completed.response.provider,
                finish_reason: completed.response.finish_reason,
                usage: completed.response.usage,
                policy_outcome: completed.output_result.final_outcome,
                redacted: completed.output_result.final_outcome == PolicyOutcome::Redact,
                metadata,
            };

            with_trace_id(Json(body).into_response(), &trace_id)
        }
        Err(error) => error_response(error, &trace_id),
    }
}

/// Map orchestrator failures to the API error surface
fn error_response(error: GatewayError, trace_id: &str) -> Response {
    let response = match &error {
        GatewayError::RequestBlocked { reason } | GatewayError::ResponseBlocked { reason } => {
            metrics::counter!("warden_decisions_total", "outcome" => "BLOCK").increment(1);
            warn!(reason = %reason, trace_id, "request rejected by policy");
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": error.to_string(),
                    "errorCode": "POLICY_BLOCKED",
                    "details": { "reason": reason, "traceId": trace_id },
                })),
            )
                .into_response()
        }
        GatewayError::RequestEscalated { review_id, reason }
        | GatewayError::ResponseEscalated { review_id, reason } => {
            metrics::counter!("warden_decisions_total", "outcome" => "ESCALATE").increment(1);
            let checkpoint = error.checkpoint().unwrap_or(Checkpoint::Input);
            info!(review_id, checkpoint = %checkpoint, trace_id, "request pending review");
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "reviewId": review_id,
                    "status": "pending_review",
                    "message": format!(
                        "Request has been escalated for human review (Review ID: {review_id})"
                    ),
                    "reason": reason,
                    "traceId": trace_id,
                    "checkpoint": checkpoint,
                })),
            )
                .into_response()
        }
        GatewayError::Router(router_error) => {
            metrics::counter!("warden_errors_total", "kind" => "router").increment(1);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": router_error.to_string(),
                    "errorCode": "INTERNAL_ERROR",
                    "details": { "traceId": trace_id },
                })),
            )
                .into_response()
        }
    };

    with_trace_id(response, trace_id)
}

fn with_trace_id(mut response: Response, trace_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        response.headers_mut().insert("X-Trace-Id", value);
    }
    response
}

// =============================================================================
// HITL review management
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewListParams {
    status: Option<String>,
    request_id: Option<String>,
    trace_id: Option<String>,
    checkpoint: Option<String>,
    assigned_to: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionParams {
    reviewed_by: String,
    review_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DequeueParams {
    assigned_to: String,
    limit: Option<i64>,
}

/// List reviews with optional filters
async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewListParams>,
) -> Response {
    let Some(hitl) = state.hitl.as_ref() else {
        return review_store_unavailable();
    };

    let mut query = ReviewQuery::new();
    if let Some(status) = &params.status {
        match status.parse::<ReviewStatus>() {
            Ok(status) => query.status = Some(status),
            Err(message) => return bad_request(message),
        }
    }
    if let Some(checkpoint) = &params.checkpoint {
        match checkpoint.parse::<Checkpoint>() {
            Ok(checkpoint) => query.checkpoint = Some(checkpoint),
            Err(e) => return bad_request(e.to_string()),
        }
    }
    query.request_id = params.request_id;
    query.trace_id = params.trace_id;
    query.assigned_to = params.assigned_to;
    query.limit = params.limit.map(|l| l.clamp(1, 1000));
    query.offset = params.offset.map(|o| o.max(0));

    match hitl.query_reviews(&query).await {
        Ok(reviews) => {
            let count = reviews.len();
            Json(json!({ "reviews": reviews, "count": count })).into_response()
        }
        Err(error) => hitl_error_response(error),
    }
}

/// Fetch one review by id
async fn get_review(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let Some(hitl) = state.hitl.as_ref() else {
        return review_store_unavailable();
    };

    match hitl.review(id).await {
        Ok(Some(review)) => Json(review).into_response(),
        Ok(None) => hitl_error_response(HitlError::NotFound(id)),
        Err(error) => hitl_error_response(error),
    }
}

/// Approve a review
async fn approve_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<DecisionParams>,
) -> Response {
    let Some(hitl) = state.hitl.as_ref() else {
        return review_store_unavailable();
    };

    match hitl
        .approve(id, &params.reviewed_by, params.review_notes.as_deref())
        .await
    {
        Ok(review) => Json(json!({
            "message": "Review approved successfully",
            "review": review,
        }))
        .into_response(),
        Err(error) => hitl_error_response(error),
    }
}

/// Reject a review
async fn reject_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<DecisionParams>,
) -> Response {
    let Some(hitl) = state.hitl.as_ref() else {
        return review_store_unavailable();
    };

    match hitl
        .reject(id, &params.reviewed_by, params.review_notes.as_deref())
        .await
    {
        Ok(review) => Json(json!({
            "message": "Review rejected successfully",
            "review": review,
        }))
        .into_response(),
        Err(error) => hitl_error_response(error),
    }
}

/// Claim the next pending review(s) for a reviewer
async fn dequeue_reviews(
    State(state): State<AppState>,
    Query(params): Query<DequeueParams>,
) -> Response {
    let Some(hitl) = state.hitl.as_ref() else {
        return review_store_unavailable();
    };

    let limit = params.limit.unwrap_or(1).clamp(1, 10);
    match hitl
        .dequeue_review(&params.assigned_to, state.review_lock_duration, limit)
        .await
    {
        Ok(reviews) => Json(json!({
            "message": format!("Dequeued {} review(s)", reviews.len()),
            "reviews": reviews,
        }))
        .into_response(),
        Err(error) => hitl_error_response(error),
    }
}

/// Map review-queue failures to status codes
fn hitl_error_response(error: HitlError) -> Response {
    let status = match &error {
        HitlError::NotFound(_) => StatusCode::NOT_FOUND,
        HitlError::InvalidDecision(_) => StatusCode::BAD_REQUEST,
        HitlError::IllegalTransition { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

fn review_store_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "review store is not configured" })),
    )
        .into_response()
}

//! HTTP adapter tests
//!
//! Drive the axum router directly with `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{engine_with, router_with, FixedPolicy, ScriptedProvider};
use serde_json::{json, Value};
use tower::ServiceExt;
use warden_core::PolicyResult;
use warden_gateway::{routes::create_router, AppState, Orchestrator};
use warden_hitl::{HitlService, MemoryReviewStore};
use warden_router::RouterError;

struct TestApp {
    router: axum::Router,
    hitl: Arc<HitlService>,
    provider: Arc<ScriptedProvider>,
    _config: tempfile::NamedTempFile,
}

/// App over one fixed policy and one scripted provider
fn app_with_policy(name: &'static str, result: PolicyResult) -> TestApp {
    let (engine, config) = engine_with(vec![(name, FixedPolicy::new(name, result))], None);
    let provider = ScriptedProvider::new("stub", vec!["test-model"]);
    let router = router_with(vec![provider.clone()], "test-model", None, 0, None);

    let hitl = Arc::new(HitlService::new(Arc::new(MemoryReviewStore::new())));
    let orchestrator = Orchestrator::new(engine, router).with_hitl(hitl.clone());
    let state = AppState::new(Arc::new(orchestrator)).with_hitl(hitl.clone());

    TestApp {
        router: create_router(state),
        hitl,
        provider,
        _config: config,
    }
}

fn allow_app() -> TestApp {
    app_with_policy("always_allow", PolicyResult::allow("always_allow", "ok"))
}

fn chat_body(prompt: &str) -> String {
    json!({
        "messages": [{ "role": "user", "content": prompt }],
        "userId": "u1",
    })
    .to_string()
}

fn chat_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = allow_app();
    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_chat_success_shape() {
    let app = allow_app();
    app.provider.respond_with("hello back");

    let response = app
        .router
        .oneshot(chat_request(chat_body("hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let trace_header = response
        .headers()
        .get("X-Trace-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("X-Trace-Id header always set");

    let body = json_body(response).await;
    assert_eq!(body["content"], "hello back");
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["provider"], "stub");
    assert_eq!(body["policyOutcome"], "ALLOW");
    assert_eq!(body["redacted"], false);
    assert_eq!(body["metadata"]["traceId"], trace_header);
    assert_eq!(body["metadata"]["inputPolicyOutcome"], "ALLOW");
    assert_eq!(body["metadata"]["outputPolicyOutcome"], "ALLOW");
    assert_eq!(body["metadata"]["policiesEvaluated"][0], "always_allow");
}

#[tokio::test]
async fn test_chat_blocked_maps_to_403() {
    let app = app_with_policy("mnpi", PolicyResult::block("mnpi", "insider information"));

    let response = app
        .router
        .oneshot(chat_request(chat_body("about the merger")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().contains_key("X-Trace-Id"));

    let body = json_body(response).await;
    assert_eq!(body["errorCode"], "POLICY_BLOCKED");
    assert!(body["details"]["reason"]
        .as_str()
        .unwrap()
        .contains("insider"));
    assert!(body["details"]["traceId"].is_string());
}

#[tokio::test]
async fn test_chat_escalated_maps_to_202() {
    let app = app_with_policy(
        "escalator",
        PolicyResult::escalate("escalator", "needs human review"),
    );

    let response = app
        .router
        .oneshot(chat_request(chat_body("risky request")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending_review");
    assert_eq!(body["reason"], "needs human review");
    assert_eq!(body["checkpoint"], "input");
    assert!(body["traceId"].is_string());

    // The review id is real and resolvable through the queue
    let review_id: i64 = body["reviewId"].as_str().unwrap().parse().unwrap();
    let review = app.hitl.review(review_id).await.unwrap().unwrap();
    assert_eq!(review.reason, "needs human review");
}

#[tokio::test]
async fn test_chat_without_user_message_is_400() {
    let app = allow_app();
    let body = json!({
        "messages": [{ "role": "system", "content": "be nice" }],
    })
    .to_string();

    let response = app.router.oneshot(chat_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_provider_failure_is_500() {
    let app = allow_app();
    app.provider.fail_with(RouterError::Auth("bad key".into()));

    let response = app
        .router
        .oneshot(chat_request(chat_body("hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["errorCode"], "INTERNAL_ERROR");
    assert!(body["details"]["traceId"].is_string());
}

async fn seed_review(app: &TestApp) -> i64 {
    let ctx = warden_core::PolicyContext::new(
        "needs a human",
        "u1",
        "req-seed",
        warden_core::Checkpoint::Input,
    );
    app.hitl
        .escalate("req-seed", &ctx, "seeded")
        .await
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_hitl_list_and_get() {
    let app = allow_app();
    let review_id = seed_review(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/api/hitl/reviews?status=pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["reviews"][0]["id"], review_id);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/api/hitl/reviews/{review_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");

    let response = app
        .router
        .oneshot(
            Request::get("/api/hitl/reviews/9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hitl_list_rejects_bad_status() {
    let app = allow_app();
    let response = app
        .router
        .oneshot(
            Request::get("/api/hitl/reviews?status=bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hitl_approve_and_conflict_on_second_decision() {
    let app = allow_app();
    let review_id = seed_review(&app).await;

    let approve = |notes: &str| {
        Request::post(format!(
            "/api/hitl/reviews/{review_id}/approve?reviewedBy=alice&reviewNotes={notes}"
        ))
        .body(Body::empty())
        .unwrap()
    };

    let response = app.router.clone().oneshot(approve("ok")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["review"]["status"], "approved");
    assert_eq!(body["review"]["reviewedBy"], "alice");
    assert!(body["review"]["decisionTimestamp"].is_string());

    // A second decision on a decided review conflicts
    let response = app.router.oneshot(approve("again")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_hitl_reject() {
    let app = allow_app();
    let review_id = seed_review(&app).await;

    let response = app
        .router
        .oneshot(
            Request::post(format!(
                "/api/hitl/reviews/{review_id}/reject?reviewedBy=bob"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["review"]["status"], "rejected");
}

#[tokio::test]
async fn test_hitl_dequeue_assigns_reviews() {
    let app = allow_app();
    seed_review(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/api/hitl/reviews/dequeue?assignedTo=alice&limit=3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["reviews"][0]["status"], "assigned");
    assert_eq!(body["reviews"][0]["assignedTo"], "alice");

    // The queue is now drained
    let response = app
        .router
        .oneshot(
            Request::post("/api/hitl/reviews/dequeue?assignedTo=bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["reviews"].as_array().unwrap().len(), 0);
}

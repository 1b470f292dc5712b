//! Model router core
//!
//! Selects a provider for each request, retries transient failures, and
//! falls back to a secondary model when the primary is exhausted.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};
use warden_core::{AuditSink, LlmRequest, LlmResponse};

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::provider::ModelProvider;
use crate::providers::{AnthropicProvider, LocalProvider, OpenAiProvider};

/// Delay between retry attempts. The retry budget is small and the
/// schedule constant, which keeps behavior deterministic under test.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Routes LLM requests to the appropriate provider.
///
/// Providers are tried in configured order; the first whose
/// `supports_model` answers true serves the request.
pub struct ModelRouter {
    config: RouterConfig,
    providers: Vec<Arc<dyn ModelProvider>>,
    audit: Option<Arc<dyn AuditSink>>,
    retry_delay: Duration,
}

impl ModelRouter {
    /// Build a router and its providers from configuration.
    ///
    /// Individual provider construction failures are logged and skipped;
    /// construction fails with `NoProviders` only when no usable provider
    /// remains.
    pub fn new(config: RouterConfig) -> Result<Self, RouterError> {
        let timeout = Duration::from_secs_f64(config.timeout_seconds);
        let mut providers: Vec<Arc<dyn ModelProvider>> = Vec::new();

        if config.use_local_daemon {
            match LocalProvider::new(&config.local_daemon_base_url, timeout) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => warn!(error = %e, "failed to initialize local daemon provider"),
            }
        }

        if let Some(api_key) = &config.openai_api_key {
            match OpenAiProvider::new(api_key, timeout) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => warn!(error = %e, "failed to initialize openai provider"),
            }
        }

        if let Some(api_key) = &config.anthropic_api_key {
            match AnthropicProvider::new(api_key, timeout) {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => warn!(error = %e, "failed to initialize anthropic provider"),
            }
        }

        Self::with_providers(config, providers)
    }

    /// Build a router over an explicit provider list (tests, custom wiring)
    pub fn with_providers(
        config: RouterConfig,
        providers: Vec<Arc<dyn ModelProvider>>,
    ) -> Result<Self, RouterError> {
        if providers.is_empty() {
            return Err(RouterError::NoProviders);
        }

        Ok(Self {
            config,
            providers,
            audit: None,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Attach an audit sink for routing events
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Override the delay between retry attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Names of the available providers, in resolution order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Union of models advertised by all providers, sorted
    pub async fn supported_models(&self) -> Vec<String> {
        let mut models = Vec::new();
        for provider in &self.providers {
            models.extend(provider.supported_models().await);
        }
        models.sort();
        models.dedup();
        models
    }

    /// Route a request to the appropriate provider.
    ///
    /// Uses `request.model` when set, the configured default otherwise.
    /// Transient failures are retried up to `max_retries`; on exhaustion a
    /// configured fallback model is tried once through the same machinery.
    pub async fn route(&self, request: &LlmRequest) -> Result<LlmResponse, RouterError> {
        request
            .validate()
            .map_err(|e| RouterError::InvalidRequest(e.to_string()))?;

        let model = request
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.config.default_model.clone());

        match self.route_with_retries(request, &model).await {
            Ok(response) => Ok(response),
            Err(primary_error) if self.should_try_fallback(&primary_error, &model) => {
                let fallback = self
                    .config
                    .fallback_model
                    .clone()
                    .unwrap_or_default();

                warn!(
                    primary = %model,
                    fallback = %fallback,
                    error = %primary_error,
                    "primary model failed, trying fallback"
                );
                self.audit_log(
                    request,
                    "model_fallback_triggered",
                    json!({
                        "from_model": model,
                        "to_model": fallback,
                        "error": primary_error.to_string(),
                    }),
                );

                match self.route_with_retries(request, &fallback).await {
                    Ok(mut response) => {
                        response
                            .metadata
                            .insert("used_fallback".to_string(), true.into());
                        Ok(response)
                    }
                    Err(fallback_error) => {
                        let combined = RouterError::Provider(format!(
                            "Both primary model '{model}' and fallback model '{fallback}' \
                             failed. Primary error: {primary_error}, Fallback error: {fallback_error}"
                        ));
                        self.audit_log(
                            request,
                            "routing_failed",
                            json!({ "model": model, "error": combined.to_string() }),
                        );
                        Err(combined)
                    }
                }
            }
            Err(error) => {
                self.audit_log(
                    request,
                    "routing_failed",
                    json!({ "model": model, "error": error.to_string() }),
                );
                Err(error)
            }
        }
    }

    /// Whether the fallback model should be tried after `error` on `model`
    fn should_try_fallback(&self, error: &RouterError, model: &str) -> bool {
        let applicable = matches!(
            error,
            RouterError::Provider(_)
                | RouterError::RateLimit(_)
                | RouterError::Timeout(_)
                | RouterError::ModelNotFound { .. }
        );

        applicable
            && self
                .config
                .fallback_model
                .as_deref()
                .is_some_and(|fallback| fallback != model)
    }

    async fn route_with_retries(
        &self,
        request: &LlmRequest,
        model: &str,
    ) -> Result<LlmResponse, RouterError> {
        let provider = self
            .find_provider(model)
            .ok_or_else(|| RouterError::ModelNotFound {
                model: model.to_string(),
                providers: self.provider_names(),
            })?;

        let mut request = request.clone();
        request.model = Some(model.to_string());

        let total_attempts = self.config.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=total_attempts {
            match provider.generate(&request).await {
                Ok(mut response) => {
                    response
                        .metadata
                        .insert("router_attempt".to_string(), attempt.into());
                    response
                        .metadata
                        .insert("router_total_attempts".to_string(), total_attempts.into());

                    info!(
                        provider = provider.name(),
                        model,
                        attempt,
                        "request routed successfully"
                    );
                    self.audit_log(
                        &request,
                        "routing_success",
                        json!({
                            "provider": provider.name(),
                            "model": model,
                            "attempt": attempt,
                        }),
                    );
                    return Ok(response);
                }
                Err(error) if error.is_retryable() => {
                    warn!(
                        provider = provider.name(),
                        model,
                        attempt,
                        error = %error,
                        "provider call failed"
                    );
                    last_error = Some(error);
                    if attempt < total_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                // Auth and model-not-found are terminal
                Err(error) => return Err(error),
            }
        }

        let last_error = last_error
            .unwrap_or_else(|| RouterError::Provider("failed to route request".to_string()));
        Err(RouterError::Provider(format!(
            "Provider '{}' failed after {total_attempts} attempts: {last_error}",
            provider.name()
        )))
    }

    /// First-match provider resolution over the configured order
    fn find_provider(&self, model: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.supports_model(model))
            .cloned()
    }

    fn audit_log(&self, request: &LlmRequest, event_type: &str, mut data: serde_json::Value) {
        if let Some(sink) = &self.audit {
            let request_id = request
                .metadata
                .get("request_id")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            if let Some(trace_id) = request.metadata.get("trace_id") {
                data["trace_id"] = trace_id.clone();
            }
            sink.log(request_id, event_type, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_core::LlmMessage;

    /// Provider whose generate results are scripted per call
    struct StubProvider {
        name: &'static str,
        models: Vec<&'static str>,
        script: Mutex<VecDeque<Result<LlmResponse, RouterError>>>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(name: &'static str, models: Vec<&'static str>) -> Self {
            Self {
                name,
                models,
                script: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn push_ok(&self, content: &str) {
            self.script
                .lock()
                .push_back(Ok(LlmResponse::new(content, self.models[0], self.name)));
        }

        fn push_err(&self, error: RouterError) {
            self.script.lock().push_back(Err(error));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn supports_model(&self, model: &str) -> bool {
            self.models.contains(&model)
        }

        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, RouterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(RouterError::Provider("script exhausted".into())))
        }

        async fn supported_models(&self) -> Vec<String> {
            self.models.iter().map(|m| m.to_string()).collect()
        }
    }

    /// Sink that records every event for assertions
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    impl AuditSink for RecordingSink {
        fn log(&self, request_id: &str, event_type: &str, data: serde_json::Value) {
            self.events
                .lock()
                .push((request_id.to_string(), event_type.to_string(), data));
        }
    }

    impl RecordingSink {
        fn event_types(&self) -> Vec<String> {
            self.events.lock().iter().map(|(_, t, _)| t.clone()).collect()
        }
    }

    fn config(max_retries: u32, fallback: Option<&str>) -> RouterConfig {
        RouterConfig {
            default_model: "primary".to_string(),
            fallback_model: fallback.map(str::to_string),
            max_retries,
            use_local_daemon: false,
            ..Default::default()
        }
    }

    fn request() -> LlmRequest {
        LlmRequest::new(vec![LlmMessage::user("hello")])
    }

    fn router(
        config: RouterConfig,
        providers: Vec<Arc<dyn ModelProvider>>,
    ) -> ModelRouter {
        ModelRouter::with_providers(config, providers)
            .unwrap()
            .with_retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_success_stamps_routing_metadata() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        provider.push_ok("hi there");
        let router = router(config(3, None), vec![provider.clone()]);

        let response = router.route(&request()).await.unwrap();
        assert_eq!(response.content, "hi there");
        assert_eq!(response.metadata["router_attempt"], 1);
        assert_eq!(response.metadata["router_total_attempts"], 4);
        assert!(response.metadata.get("used_fallback").is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_model_overrides_default() {
        let primary = Arc::new(StubProvider::new("a", vec!["primary"]));
        let other = Arc::new(StubProvider::new("b", vec!["special"]));
        other.push_ok("from b");
        let router = router(config(0, None), vec![primary.clone(), other.clone()]);

        let response = router
            .route(&request().with_model("special"))
            .await
            .unwrap();
        assert_eq!(response.content, "from b");
        assert_eq!(primary.calls(), 0);
        assert_eq!(other.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        provider.push_err(RouterError::RateLimit("slow down".into()));
        provider.push_ok("second try");
        let router = router(config(3, None), vec![provider.clone()]);

        let response = router.route(&request()).await.unwrap();
        assert_eq!(response.content, "second try");
        assert_eq!(response.metadata["router_attempt"], 2);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_provider_error() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        for _ in 0..3 {
            provider.push_err(RouterError::Timeout("too slow".into()));
        }
        let router = router(config(2, None), vec![provider.clone()]);

        let error = router.route(&request()).await.unwrap_err();
        assert!(matches!(error, RouterError::Provider(_)));
        assert!(error.to_string().contains("failed after 3 attempts"));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_auth_error_is_terminal() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        provider.push_err(RouterError::Auth("bad key".into()));
        let router = router(config(5, Some("fallback")), vec![provider.clone()]);

        let error = router.route(&request()).await.unwrap_err();
        assert!(matches!(error, RouterError::Auth(_)));
        // No retries and no fallback attempt
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_model_fails_with_model_not_found() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        let router = router(config(0, None), vec![provider]);

        let error = router
            .route(&request().with_model("unknown"))
            .await
            .unwrap_err();
        assert!(matches!(error, RouterError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fallback_succeeds_after_primary_exhaustion() {
        let primary = Arc::new(StubProvider::new("primary-provider", vec!["primary"]));
        for _ in 0..2 {
            primary.push_err(RouterError::RateLimit("429".into()));
        }
        let fallback = Arc::new(StubProvider::new("fallback-provider", vec!["backup"]));
        fallback.push_ok("from fallback");

        let sink = Arc::new(RecordingSink::default());
        let router = ModelRouter::with_providers(
            config(1, Some("backup")),
            vec![primary.clone(), fallback.clone()],
        )
        .unwrap()
        .with_retry_delay(Duration::ZERO)
        .with_audit_sink(sink.clone());

        let response = router.route(&request()).await.unwrap();
        assert_eq!(response.content, "from fallback");
        assert_eq!(response.metadata["used_fallback"], true);
        assert_eq!(primary.calls(), 2);
        assert_eq!(fallback.calls(), 1);

        let events = sink.event_types();
        assert!(events.contains(&"model_fallback_triggered".to_string()));
        assert!(events.contains(&"routing_success".to_string()));
        // The success event names the fallback provider
        let success = sink
            .events
            .lock()
            .iter()
            .find(|(_, t, _)| t == "routing_success")
            .map(|(_, _, d)| d.clone())
            .unwrap();
        assert_eq!(success["provider"], "fallback-provider");
    }

    #[tokio::test]
    async fn test_unconfigured_fallback_surfaces_primary_error() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        provider.push_err(RouterError::Timeout("slow".into()));
        let router = router(config(0, None), vec![provider.clone()]);

        let error = router.route(&request()).await.unwrap_err();
        assert!(error.to_string().contains("failed after 1 attempts"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_equal_to_primary_is_not_retried() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        provider.push_err(RouterError::Timeout("slow".into()));
        let router = router(config(0, Some("primary")), vec![provider.clone()]);

        router.route(&request()).await.unwrap_err();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_models_failing_combines_errors() {
        let primary = Arc::new(StubProvider::new("a", vec!["primary"]));
        primary.push_err(RouterError::Provider("primary down".into()));
        let fallback = Arc::new(StubProvider::new("b", vec!["backup"]));
        fallback.push_err(RouterError::Provider("backup down".into()));

        let router = router(
            config(0, Some("backup")),
            vec![primary, fallback],
        );

        let error = router.route(&request()).await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("primary"));
        assert!(message.contains("backup"));
        assert!(message.contains("Primary error"));
        assert!(message.contains("Fallback error"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_routing() {
        let provider = Arc::new(StubProvider::new("stub", vec!["primary"]));
        let router = router(config(0, None), vec![provider.clone()]);

        let error = router.route(&LlmRequest::new(vec![])).await.unwrap_err();
        assert!(matches!(error, RouterError::InvalidRequest(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_no_providers_fails_construction() {
        assert!(matches!(
            ModelRouter::with_providers(config(0, None), vec![]),
            Err(RouterError::NoProviders)
        ));
    }

    #[tokio::test]
    async fn test_supported_models_aggregates_and_sorts() {
        let a = Arc::new(StubProvider::new("a", vec!["zeta", "alpha"]));
        let b = Arc::new(StubProvider::new("b", vec!["alpha", "mid"]));
        let router = router(config(0, None), vec![a, b]);

        assert_eq!(
            router.supported_models().await,
            vec!["alpha", "mid", "zeta"]
        );
    }
}

//! Shared fixtures for gateway integration tests

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use warden_core::{AuditSink, LlmRequest, LlmResponse, PolicyContext, PolicyResult};
use warden_policy::{PolicyEngine, PolicyModule, PolicyRegistry};
use warden_router::{ModelProvider, ModelRouter, RouterConfig, RouterError};

/// Policy that returns a fixed result at every checkpoint
pub struct FixedPolicy {
    name: &'static str,
    result: PolicyResult,
}

impl FixedPolicy {
    pub fn new(name: &'static str, result: PolicyResult) -> Arc<dyn PolicyModule> {
        Arc::new(Self { name, result })
    }
}

impl PolicyModule for FixedPolicy {
    fn name(&self) -> &str {
        self.name
    }

    fn evaluate(&self, _ctx: &PolicyContext) -> warden_core::Result<PolicyResult> {
        Ok(self.result.clone())
    }
}

/// Provider whose responses are scripted and whose requests are recorded
pub struct ScriptedProvider {
    name: &'static str,
    models: Vec<&'static str>,
    script: Mutex<VecDeque<Result<String, RouterError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, models: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            name,
            models,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Queue a successful generation returning `content`
    pub fn respond_with(&self, content: &str) {
        self.script.lock().push_back(Ok(content.to_string()));
    }

    /// Queue a failure
    pub fn fail_with(&self, error: RouterError) {
        self.script.lock().push_back(Err(error));
    }

    /// Requests seen so far, in call order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn supports_model(&self, model: &str) -> bool {
        self.models.contains(&model)
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, RouterError> {
        self.requests.lock().push(request.clone());
        let scripted = self.script.lock().pop_front();
        let model = request.model.clone().unwrap_or_default();
        match scripted {
            Some(Ok(content)) => Ok(LlmResponse::new(content, model, self.name)),
            Some(Err(error)) => Err(error),
            None => Ok(LlmResponse::new("stub response", model, self.name)),
        }
    }

    async fn supported_models(&self) -> Vec<String> {
        self.models.iter().map(|m| m.to_string()).collect()
    }
}

/// Build a policy engine running the given modules in order.
///
/// Returns the temp file backing the configuration so it outlives the
/// engine for the duration of the test.
pub fn engine_with(
    policies: Vec<(&str, Arc<dyn PolicyModule>)>,
    audit: Option<Arc<dyn AuditSink>>,
) -> (Arc<PolicyEngine>, NamedTempFile) {
    let registry = Arc::new(PolicyRegistry::new());
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "policies:").unwrap();
    for (name, module) in policies {
        registry.register(name, module).unwrap();
        writeln!(file, "  - name: {name}\n    enabled: true").unwrap();
    }

    let engine = PolicyEngine::from_config(registry, file.path(), audit).unwrap();
    (Arc::new(engine), file)
}

/// Router over the given providers with zero retry delay
pub fn router_with(
    providers: Vec<Arc<dyn ModelProvider>>,
    default_model: &str,
    fallback_model: Option<&str>,
    max_retries: u32,
    audit: Option<Arc<dyn AuditSink>>,
) -> Arc<ModelRouter> {
    let config = RouterConfig {
        default_model: default_model.to_string(),
        fallback_model: fallback_model.map(str::to_string),
        max_retries,
        use_local_daemon: false,
        ..Default::default()
    };

    let mut router = ModelRouter::with_providers(config, providers)
        .unwrap()
        .with_retry_delay(Duration::ZERO);
    if let Some(sink) = audit {
        router = router.with_audit_sink(sink);
    }
    Arc::new(router)
}

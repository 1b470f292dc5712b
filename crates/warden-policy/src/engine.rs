//! Policy evaluation engine
//!
//! Runs the configured, ordered set of policy modules against a context and
//! resolves their outcomes under the precedence lattice.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, warn};
use warden_core::{
    AuditSink, PolicyContext, PolicyEvaluationResult, PolicyOutcome, PolicyResult, Result,
};

use crate::config::load_policy_config;
use crate::module::PolicyModule;
use crate::registry::PolicyRegistry;

/// Policy name used for synthetic results produced by the engine itself
const SYSTEM_POLICY: &str = "system";

/// Orchestrates policy evaluation.
///
/// Combines the registry (available modules) and the configuration document
/// (which modules run, in which order, with which options) into a cached
/// active list. Evaluation clones the active list and never holds the lock
/// across policy execution; reconfiguration rebuilds the list and swaps it
/// atomically.
pub struct PolicyEngine {
    registry: Arc<PolicyRegistry>,
    audit: Option<Arc<dyn AuditSink>>,
    config_path: RwLock<Option<PathBuf>>,
    active: RwLock<Vec<(String, Arc<dyn PolicyModule>)>>,
    skipped: RwLock<Vec<String>>,
}

impl PolicyEngine {
    /// Create an engine with no configuration loaded.
    ///
    /// Until `load_configuration` is called the active set is empty and
    /// every evaluation resolves to the synthetic `ALLOW`.
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self {
            registry,
            audit: None,
            config_path: RwLock::new(None),
            active: RwLock::new(Vec::new()),
            skipped: RwLock::new(Vec::new()),
        }
    }

    /// Attach an audit sink for evaluation events
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Create an engine and load configuration in one step
    pub fn from_config(
        registry: Arc<PolicyRegistry>,
        config_path: impl AsRef<Path>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self> {
        let mut engine = Self::new(registry);
        engine.audit = audit;
        engine.load_configuration(config_path)?;
        Ok(engine)
    }

    /// Load (or reload) the policy configuration.
    ///
    /// Resolves each enabled entry against the registry, calls `configure`
    /// with its option bag, and atomically swaps the cached active list.
    /// Entries whose names are absent from the registry are recorded and
    /// skipped with a warning; they are not an error.
    pub fn load_configuration(&self, config_path: impl AsRef<Path>) -> Result<()> {
        let config_path = config_path.as_ref();
        let entries = load_policy_config(config_path)?;

        let mut active = Vec::new();
        let mut skipped = Vec::new();

        for entry in entries {
            let Some(module) = self.registry.get(&entry.name) else {
                skipped.push(entry.name);
                continue;
            };

            if entry.enabled {
                module.configure(&entry.config)?;
                active.push((entry.name, module));
            }
        }

        if !skipped.is_empty() {
            warn!(
                policies = ?skipped,
                "configuration references policies not in the registry; skipping"
            );
        }

        *self.config_path.write() = Some(config_path.to_path_buf());
        *self.active.write() = active;
        *self.skipped.write() = skipped;
        Ok(())
    }

    /// Names of the active (enabled and resolved) policies, in run order
    pub fn active_policies(&self) -> Vec<String> {
        self.active.read().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Configured policy names that were not found in the registry at the
    /// last configuration load
    pub fn skipped_policies(&self) -> Vec<String> {
        self.skipped.read().clone()
    }

    /// Register a policy module and, when configuration is already loaded,
    /// reload it so the new module can take its configured place.
    pub fn register_policy(&self, name: impl Into<String>, module: Arc<dyn PolicyModule>) -> Result<()> {
        self.registry.register(name, module)?;

        let config_path = self.config_path.read().clone();
        if let Some(path) = config_path {
            self.load_configuration(path)?;
        }
        Ok(())
    }

    /// Evaluate all active policies against the given context.
    ///
    /// Policies run strictly in configured order; after each one its outcome
    /// is appended to `ctx.prior_outcomes` so later policies can observe it.
    /// A failing policy yields a synthetic fail-closed `BLOCK` result and
    /// the chain continues.
    pub fn evaluate(&self, ctx: &mut PolicyContext) -> PolicyEvaluationResult {
        let started = Instant::now();

        self.audit_log(
            &ctx.request_id,
            "policy_evaluation_start",
            json!({
                "checkpoint": ctx.checkpoint,
                "request_id": ctx.request_id,
                "trace_id": ctx.trace_id(),
            }),
        );

        let active = self.active.read().clone();

        let mut all_results: Vec<PolicyResult> = Vec::with_capacity(active.len());
        let mut evaluated_policies: Vec<String> = Vec::with_capacity(active.len());

        for (name, module) in &active {
            let result = match module.evaluate(ctx) {
                Ok(result) => result,
                Err(e) => {
                    // Fail closed: a crashing policy must not allow traffic.
                    warn!(policy = %name, error = %e, "policy evaluation failed");
                    PolicyResult::block(
                        name.clone(),
                        format!("Policy '{name}' evaluation failed: {e}"),
                    )
                    .with_confidence(1.0)
                }
            };

            ctx.prior_outcomes.push(result.outcome);
            evaluated_policies.push(name.clone());

            self.audit_log(
                &ctx.request_id,
                "policy_evaluated",
                json!({
                    "name": name,
                    "outcome": result.outcome,
                    "trace_id": ctx.trace_id(),
                }),
            );

            all_results.push(result);
        }

        let (final_outcome, final_result) = if all_results.is_empty() {
            debug!(request_id = %ctx.request_id, "no active policies, defaulting to ALLOW");
            (
                PolicyOutcome::Allow,
                PolicyResult::allow(SYSTEM_POLICY, "No active policies to evaluate")
                    .with_confidence(1.0),
            )
        } else {
            let final_outcome =
                PolicyOutcome::resolve(all_results.iter().map(|result| result.outcome));
            // Stable tie-break: the first result in run order that produced
            // the final outcome wins.
            let final_result = all_results
                .iter()
                .find(|result| result.outcome == final_outcome)
                .cloned()
                .unwrap_or_else(|| all_results[0].clone());
            (final_outcome, final_result)
        };

        let evaluation_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.audit_log(
            &ctx.request_id,
            "policy_evaluation_complete",
            json!({
                "final_outcome": final_outcome,
                "evaluated_policies": evaluated_policies,
                "evaluation_time_ms": evaluation_time_ms,
                "trace_id": ctx.trace_id(),
            }),
        );

        PolicyEvaluationResult {
            final_outcome,
            final_result,
            all_results,
            evaluated_policies,
            evaluation_time_ms,
        }
    }

    fn audit_log(&self, request_id: &str, event_type: &str, data: serde_json::Value) {
        if let Some(sink) = &self.audit {
            sink.log(request_id, event_type, data);
        }
    }
}

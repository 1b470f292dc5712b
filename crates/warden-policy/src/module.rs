//! Policy module contract

use warden_core::{PolicyContext, PolicyResult, Result};

/// Contract implemented by every pluggable policy.
///
/// Modules are shared as `Arc<dyn PolicyModule>` and evaluated concurrently
/// across requests, so implementations keep their compiled rules behind
/// interior mutability and treat `evaluate` as read-only.
///
/// Contracts:
/// - `evaluate` is pure with respect to external state: its decision may
///   depend on the context, on rules compiled at `configure` time, and on
///   the system clock; never on previous calls. It must not perform I/O.
/// - `evaluate` returns a typed error instead of panicking; the engine
///   converts failures into a fail-closed `BLOCK`.
/// - A `Redact` result carries the rewritten text in `modified_content`
///   and, optionally, a reversible token mapping in `redaction_tokens`.
pub trait PolicyModule: Send + Sync {
    /// Unique name of this policy (e.g., "pii_redaction", "mnpi_guard")
    fn name(&self) -> &str;

    /// Apply the option bag from the configuration document.
    ///
    /// Called once per configuration load, before the first `evaluate`.
    /// The default implementation ignores the options.
    fn configure(&self, _options: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    /// Evaluate the policy against the given context
    fn evaluate(&self, ctx: &PolicyContext) -> Result<PolicyResult>;
}

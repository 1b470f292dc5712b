//! Built-in policy modules
//!
//! Each built-in policy is an ordinary [`PolicyModule`](crate::PolicyModule)
//! implementation; the engine treats them no differently from externally
//! supplied modules. They cover the common governance concerns of an LLM
//! deployment in a regulated environment: PII redaction, MNPI screening,
//! prompt-size limits, and keyword-driven escalation to human review.

pub mod keyword;
pub mod length;
pub mod mnpi;
pub mod pii;

pub use keyword::KeywordEscalationPolicy;
pub use length::PromptLengthPolicy;
pub use mnpi::MnpiGuardPolicy;
pub use pii::PiiRedactionPolicy;

use std::sync::Arc;

use warden_core::Result;

use crate::registry::PolicyRegistry;

/// Register every built-in policy under its canonical name
pub fn register_builtin_policies(registry: &PolicyRegistry) -> Result<()> {
    registry.register(pii::POLICY_NAME, Arc::new(PiiRedactionPolicy::new()))?;
    registry.register(mnpi::POLICY_NAME, Arc::new(MnpiGuardPolicy::new()))?;
    registry.register(length::POLICY_NAME, Arc::new(PromptLengthPolicy::new()))?;
    registry.register(
        keyword::POLICY_NAME,
        Arc::new(KeywordEscalationPolicy::new()),
    )?;
    Ok(())
}

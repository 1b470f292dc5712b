//! Warden Policy Engine
//!
//! Pluggable policy evaluation for the governance gateway.
//!
//! The pieces fit together like this: policy modules implement
//! [`PolicyModule`] and are registered by name in a [`PolicyRegistry`]; a
//! YAML configuration document selects and orders the enabled modules; the
//! [`PolicyEngine`] runs the enabled set in order against a
//! `PolicyContext` and collapses the per-policy outcomes into a single
//! decision under the precedence lattice (`BLOCK` beats `ESCALATE` beats
//! `REDACT` beats `ALLOW`). A crashing policy never allows traffic: its
//! failure is surfaced as a synthetic `BLOCK` result and the chain continues.

pub mod config;
pub mod engine;
pub mod module;
pub mod policies;
pub mod registry;

pub use config::{enabled_policies, load_policy_config, PolicyConfigEntry};
pub use engine::PolicyEngine;
pub use module::PolicyModule;
pub use registry::PolicyRegistry;

//! Warden Gateway
//!
//! The request-serving layer of the governance platform. The
//! [`Orchestrator`] drives every request through the dual-checkpoint flow:
//! input policy evaluation, model routing, output policy evaluation, with
//! escalation to the human review queue whenever a policy demands judgment.
//! The HTTP adapter in [`routes`] is a thin mapping from the API surface to
//! orchestrator and review-queue operations.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use orchestrator::{ChatOptions, Completed, Orchestrator};
pub use state::AppState;

//! Gateway configuration
//!
//! One YAML document configures the whole gateway. The `policies:` and
//! `model_router:` sections are parsed by their owning crates; this module
//! covers the server and review-queue settings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use warden_core::{Error, Result};

/// Top-level gateway settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Review queue settings
    #[serde(default)]
    pub hitl: HitlConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Review queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlConfig {
    /// How long a dequeued review stays locked to its reviewer, in seconds
    #[serde(default = "default_lock_duration_seconds")]
    pub lock_duration_seconds: u64,
}

impl Default for HitlConfig {
    fn default() -> Self {
        Self {
            lock_duration_seconds: default_lock_duration_seconds(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_lock_duration_seconds() -> u64 {
    300
}

impl GatewayConfig {
    /// Load gateway settings from a YAML file. Missing sections fall back
    /// to defaults; a missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read gateway configuration {}: {e}",
                path.display()
            ))
        })?;

        Ok(serde_yaml::from_str(&content)?)
    }
}

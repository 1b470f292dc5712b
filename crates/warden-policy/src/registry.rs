//! Policy registry
//!
//! Name-to-module mapping for all available policies. The registry is
//! read-mostly after startup; the engine resolves enabled names against it
//! when configuration is loaded.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use warden_core::{Error, Result};

use crate::module::PolicyModule;

/// Registry of policy modules keyed by unique name
#[derive(Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<String, Arc<dyn PolicyModule>>>,
}

impl PolicyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy module under a unique name.
    ///
    /// Fails with `DuplicateName` if the name is taken (preventing
    /// accidental overwrites) and `InvalidName` if it is empty/whitespace.
    pub fn register(&self, name: impl Into<String>, policy: Arc<dyn PolicyModule>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidName);
        }

        let mut policies = self.policies.write();
        if policies.contains_key(&name) {
            return Err(Error::DuplicateName(name));
        }
        policies.insert(name, policy);
        Ok(())
    }

    /// Remove a registered policy. Fails if the name is unknown.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let mut policies = self.policies.write();
        if policies.remove(name).is_none() {
            return Err(Error::config(format!("policy '{name}' is not registered")));
        }
        Ok(())
    }

    /// Look up a policy by name. Unknown names return `None` rather than
    /// failing.
    pub fn get(&self, name: &str) -> Option<Arc<dyn PolicyModule>> {
        self.policies.read().get(name).cloned()
    }

    /// Whether a policy is registered under this name
    pub fn is_registered(&self, name: &str) -> bool {
        self.policies.read().contains_key(name)
    }

    /// Snapshot of all registered policies.
    ///
    /// The returned map is a copy and does not reflect later mutations.
    pub fn all(&self) -> HashMap<String, Arc<dyn PolicyModule>> {
        self.policies.read().clone()
    }

    /// Snapshot of all registered policy names
    pub fn names(&self) -> Vec<String> {
        self.policies.read().keys().cloned().collect()
    }

    /// Number of registered policies
    pub fn count(&self) -> usize {
        self.policies.read().len()
    }

    /// Remove all registered policies
    pub fn clear(&self) {
        self.policies.write().clear();
    }
}

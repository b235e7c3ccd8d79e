//! Capability Registry: the process-wide map from name to live capability.
//!
//! The registry is an explicit service object shared by `Arc`; there is no
//! static instance. Registration is last-write-wins with no versioning.
//! Only fully constructed capabilities are ever inserted, so nothing
//! half-built is visible to [`lookup`](CapabilityRegistry::lookup).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::calculator::CalculatorCapability;
use super::capability::Capability;

/// Registry of available capabilities, indexed by name.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    capabilities: RwLock<HashMap<String, Arc<dyn Capability>>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in capabilities (the calculator).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(CalculatorCapability::new()));
        registry
    }

    /// Insert or overwrite a capability under its own name.
    pub fn register(&self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        let replaced = self
            .capabilities
            .write()
            .insert(name.clone(), capability)
            .is_some();
        if replaced {
            log::info!("Replaced capability: {}", name);
        } else {
            log::debug!("Registered capability: {}", name);
        }
    }

    /// Look up a capability by exact, case-sensitive name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.read().get(name).cloned()
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.read().contains_key(name)
    }

    /// Snapshot of registered names, sorted for stable output.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, description)` pairs, sorted by name.
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .capabilities
            .read()
            .values()
            .map(|c| (c.name().to_string(), c.description().to_string()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.read().is_empty()
    }
}

//! Explicit name-to-provider wiring.
//!
//! The host builds a registry, registers the providers it constructed and
//! hands the registry to whatever selects a provider by configured name.
//! There is no process-wide registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::provider::Provider;

/// Providers keyed by name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its own name.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<()> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(Error::DuplicateProvider(name));
        }
        debug!(provider = %name, "Registered session provider");
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Result<Self> {
        self.register(provider)?;
        Ok(self)
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

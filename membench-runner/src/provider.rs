//! Provider construction. Adapters live outside the core; the runner
//! only sees a factory per registered provider name and owns each
//! created handle for exactly one (benchmark, provider) task.

use std::sync::Arc;

use async_trait::async_trait;

use membench_core::domain::ProviderConfig;
use membench_core::traits::Provider;
use membench_core::{Registry, RegistryError, Result};

#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>>;
}

#[derive(Clone)]
pub struct ProviderEntry {
    pub config: ProviderConfig,
    pub factory: Arc<dyn ProviderFactory>,
}

pub struct ProviderRegistry {
    inner: Registry<ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("provider"),
        }
    }

    pub fn register(
        &mut self,
        config: ProviderConfig,
        factory: Arc<dyn ProviderFactory>,
    ) -> std::result::Result<(), RegistryError> {
        let name = config.name.clone();
        self.inner.register(name, ProviderEntry { config, factory })
    }

    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        self.inner.get(name)
    }

    pub fn get_required(&self, name: &str) -> std::result::Result<&ProviderEntry, RegistryError> {
        self.inner.get_required(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ProviderRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

use std::sync::Arc;

use membench_core::traits::Loader;
use membench_core::{Registry, RegistryError};

use crate::code::CodeRetrievalLoader;
use crate::schema::SchemaLoader;

/// Maps benchmark names to specialized loaders. Unknown names fall
/// through to the schema-driven path.
pub struct LoaderRegistry {
    inner: Registry<Arc<dyn Loader>>,
    fallback: Arc<dyn Loader>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("loader"),
            fallback: Arc::new(SchemaLoader),
        }
    }

    /// Registry with the built-in specialized loaders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_many([
                (
                    "code-retrieval-function",
                    &["code-function"][..],
                    Arc::new(CodeRetrievalLoader::function()) as Arc<dyn Loader>,
                ),
                (
                    "code-retrieval-line",
                    &["code-line"][..],
                    Arc::new(CodeRetrievalLoader::line()) as Arc<dyn Loader>,
                ),
                (
                    "code-retrieval-api",
                    &["code-api"][..],
                    Arc::new(CodeRetrievalLoader::api()) as Arc<dyn Loader>,
                ),
                (
                    "code-retrieval-cross-file",
                    &["code-cross-file"][..],
                    Arc::new(CodeRetrievalLoader::cross_file()) as Arc<dyn Loader>,
                ),
            ])
            .expect("built-in loaders are conflict-free");
        registry
    }

    fn register_many<I>(&mut self, entries: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (&'static str, &'static [&'static str], Arc<dyn Loader>)>,
    {
        for (name, aliases, loader) in entries {
            self.inner.register_with_aliases(name, loader, aliases)?;
        }
        Ok(())
    }

    pub fn register(
        &mut self,
        benchmark: impl Into<String>,
        loader: Arc<dyn Loader>,
    ) -> Result<(), RegistryError> {
        self.inner.register(benchmark, loader)
    }

    /// Loader for a benchmark name; the schema loader when none is
    /// registered.
    pub fn resolve(&self, benchmark: &str) -> Arc<dyn Loader> {
        self.inner
            .get(benchmark)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_through_to_schema() {
        let registry = LoaderRegistry::with_defaults();
        assert_eq!(registry.resolve("longmemeval").name(), "schema");
        assert_eq!(registry.resolve("locomo").name(), "schema");
    }

    #[test]
    fn specialized_loaders_resolve_by_name_and_alias() {
        let registry = LoaderRegistry::with_defaults();
        assert_eq!(
            registry.resolve("code-retrieval-function").name(),
            "code-function"
        );
        assert_eq!(registry.resolve("code-line").name(), "code-line");
    }
}

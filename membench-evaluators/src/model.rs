//! Model routing behind the single `generate_text` contract.

use std::sync::Arc;

use async_trait::async_trait;

use membench_core::traits::{GenerateRequest, GenerateResponse, ModelClient};
use membench_core::{CoreError, Registry, RegistryError, Result};

/// Splits a `"{provider}/{model}"` spec; bare model names are inferred
/// from well-known naming patterns.
pub fn resolve_model_spec(spec: &str) -> Result<(String, String)> {
    if let Some((provider, model)) = spec.split_once('/') {
        if provider.is_empty() || model.is_empty() {
            return Err(CoreError::Model(format!("malformed model spec '{spec}'")));
        }
        return Ok((provider.to_string(), model.to_string()));
    }

    let provider = if spec.starts_with("claude") {
        "anthropic"
    } else if spec.starts_with("gpt") {
        "openai"
    } else if spec.starts_with("gemini") {
        "google"
    } else {
        return Err(CoreError::Model(format!(
            "cannot infer a provider for model '{spec}'; use the {{provider}}/{{model}} form"
        )));
    };
    Ok((provider.to_string(), spec.to_string()))
}

/// Routes `generate_text` calls to a registered backend by provider
/// prefix. Unknown providers fail fast listing the registered backends.
pub struct ModelRouter {
    backends: Registry<Arc<dyn ModelClient>>,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self {
            backends: Registry::new("model-provider"),
        }
    }

    pub fn register_backend(
        &mut self,
        provider: impl Into<String>,
        client: Arc<dyn ModelClient>,
    ) -> std::result::Result<(), RegistryError> {
        self.backends.register(provider, client)
    }

    pub fn providers(&self) -> Vec<String> {
        self.backends.keys()
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for ModelRouter {
    async fn generate_text(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let (provider, model) = resolve_model_spec(&request.model)?;
        let backend = self.backends.get_required(&provider)?;
        backend
            .generate_text(&GenerateRequest {
                model,
                prompt: request.prompt.clone(),
                temperature: request.temperature,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_prefix_wins() {
        assert_eq!(
            resolve_model_spec("anthropic/claude-3-5-sonnet").unwrap(),
            ("anthropic".to_string(), "claude-3-5-sonnet".to_string())
        );
    }

    #[test]
    fn well_known_names_are_inferred() {
        assert_eq!(resolve_model_spec("claude-3-5-haiku").unwrap().0, "anthropic");
        assert_eq!(resolve_model_spec("gpt-4o-mini").unwrap().0, "openai");
        assert_eq!(resolve_model_spec("gemini-1.5-pro").unwrap().0, "google");
    }

    #[test]
    fn unknown_names_fail_fast() {
        let err = resolve_model_spec("mystery-model").unwrap_err();
        assert!(err.to_string().contains("mystery-model"));
    }

    #[tokio::test]
    async fn unknown_backend_lists_registered_providers() {
        let router = ModelRouter::new();
        let err = router
            .generate_text(&GenerateRequest {
                model: "anthropic/claude-3-5-haiku".to_string(),
                prompt: "hi".to_string(),
                temperature: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model-provider"));
    }
}

//! Name-keyed provider factory.
//!
//! Each backend family registers a constructor once at startup;
//! [`ProviderRegistry::create`] instantiates a fresh provider per
//! "choose provider" request. The registry holds no per-request state and is
//! safe for concurrent reads after startup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ChatError;
use crate::provider::{OllamaProvider, Provider};

/// Constructor for one backend family.
pub type ProviderCtor =
    Box<dyn Fn(&Config) -> Result<Arc<dyn Provider>, ChatError> + Send + Sync>;

pub struct ProviderRegistry {
    ctors: HashMap<String, ProviderCtor>,
}

impl ProviderRegistry {
    /// Empty registry, for callers that wire their own backends.
    pub fn new() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// Registry with all built-in backends registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(OllamaProvider::NAME, |config| {
            Ok(Arc::new(OllamaProvider::new(&config.ollama)?))
        });
        registry
    }

    /// Associate `name` with a constructor. Lookup is case-insensitive.
    pub fn register<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&Config) -> Result<Arc<dyn Provider>, ChatError> + Send + Sync + 'static,
    {
        self.ctors.insert(name.to_lowercase(), Box::new(ctor));
    }

    /// Construct a provider for `name`, or fail with
    /// [`ChatError::UnknownProvider`].
    pub fn create(&self, name: &str, config: &Config) -> Result<Arc<dyn Provider>, ChatError> {
        let ctor = self
            .ctors
            .get(&name.to_lowercase())
            .ok_or_else(|| ChatError::UnknownProvider(name.to_string()))?;
        ctor(config)
    }

    /// Registered backend names, lowercase, in no particular order.
    pub fn names(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ollama_is_registered() {
        let registry = ProviderRegistry::with_builtins();
        let provider = registry.create("Ollama", &Config::default()).unwrap();
        assert_eq!(provider.name(), "Ollama");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = ProviderRegistry::with_builtins();
        assert!(registry.create("ollama", &Config::default()).is_ok());
        assert!(registry.create("OLLAMA", &Config::default()).is_ok());
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = ProviderRegistry::with_builtins();
        let err = registry.create("bedrock", &Config::default()).unwrap_err();
        assert!(matches!(err, ChatError::UnknownProvider(_)));
        assert!(err.to_string().contains("bedrock"));
    }

    #[test]
    fn custom_registration() {
        use crate::provider::mock::MockProvider;

        let mut registry = ProviderRegistry::new();
        registry.register("mock", |_config| {
            Ok(Arc::new(MockProvider::with_fragments(vec!["ok"])))
        });
        let provider = registry.create("Mock", &Config::default()).unwrap();
        assert_eq!(provider.name(), "Mock");
    }

    #[test]
    fn construction_errors_propagate() {
        let mut config = Config::default();
        config.ollama.host = "not-a-url".to_string();
        let registry = ProviderRegistry::with_builtins();
        let err = registry.create("ollama", &config).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }
}

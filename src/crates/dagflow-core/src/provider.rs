//! Model provider seam.
//!
//! The original engine this crate is modeled on kept its model-provider
//! configuration in a process-global mutable singleton. Adapters that need
//! to make an LLM call took an implicit dependency on that global rather
//! than an explicit one. Here that dependency is explicit: adapters receive
//! a `&dyn ModelProvider` through [`crate::registry::AdapterContext`]
//! instead of reaching for global state.

use serde_json::Value;

/// Resolved configuration for one named model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub provider: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub extra: Value,
}

/// Looks up model configuration by name. Implementations range from a
/// static table to one backed by environment variables or a config file;
/// `dagflow-adapters` provides the built-in implementations actually used
/// at the adapter call sites.
pub trait ModelProvider: Send + Sync {
    fn get_model(&self, name: &str) -> Option<ModelConfig>;
}

/// A provider with no models configured. This is what [`crate::engine::Engine::new`]
/// installs by default — engines that never call an LLM adapter never need
/// to supply a real one.
#[derive(Debug, Default)]
pub struct NullModelProvider;

impl ModelProvider for NullModelProvider {
    fn get_model(&self, _name: &str) -> Option<ModelConfig> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_has_no_models() {
        let p = NullModelProvider;
        assert!(p.get_model("gpt-4").is_none());
    }
}

//! Model configuration table and [`dagflow_core::ModelProvider`] implementation.
//!
//! A small built-in table covers the common local/default case (Ollama on
//! localhost); anything not in the table falls back to an OpenAI-compatible
//! HTTP API, matching how the engine this is modeled on treats unknown
//! model names.

use dagflow_core::{ModelConfig, ModelProvider};
use dagflow_tooling::config::get_env_or;
use serde_json::json;
use std::collections::HashMap;
use std::sync::RwLock;

/// Ollama's base URL is read from `OLLAMA_BASE_URL` so a local dev box
/// pointed at a non-default port doesn't need a code change.
fn ollama_base_url() -> String {
    get_env_or("OLLAMA_BASE_URL", "http://localhost:11434/api/chat").unwrap_or_else(|_| "http://localhost:11434/api/chat".to_string())
}

fn default_providers() -> HashMap<String, ModelConfig> {
    let base_url = ollama_base_url();
    let ollama = |name: &str, max_tokens: u32, base_url: &str| ModelConfig {
        name: name.to_string(),
        provider: "ollama".to_string(),
        base_url: Some(base_url.to_string()),
        api_key: None,
        extra: json!({
            "message_format": "ollama",
            "max_tokens": max_tokens,
            "supports": ["temperature", "top_p", "top_k"],
        }),
    };

    [
        ("gemma3:4b".to_string(), ollama("gemma3:4b", 8192, &base_url)),
        ("qwen2.5".to_string(), ollama("qwen2.5", 8192, &base_url)),
        ("gemma2".to_string(), ollama("gemma2", 8192, &base_url)),
        ("phi3".to_string(), ollama("phi3", 4096, &base_url)),
    ]
    .into_iter()
    .collect()
}

fn openai_compatible_default(model: &str) -> ModelConfig {
    let base_url = get_env_or("OPENAI_BASE_URL", "https://api.openai.com/v1/chat/completions")
        .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
    let api_key = get_env_or("OPENAI_API_KEY", "").ok().filter(|k| !k.is_empty());
    ModelConfig {
        name: model.to_string(),
        provider: "openai_compatible".to_string(),
        base_url: Some(base_url),
        api_key,
        extra: json!({
            "message_format": "openai",
            "max_tokens": 4096,
            "supports": ["temperature", "top_p", "frequency_penalty", "presence_penalty", "stop"],
        }),
    }
}

/// A [`ModelProvider`] backed by an in-memory table, seeded with
/// [`default_providers`]. Unknown model names still resolve, to an
/// OpenAI-compatible default, rather than failing the lookup.
pub struct ModelConfigProvider {
    providers: RwLock<HashMap<String, ModelConfig>>,
}

impl Default for ModelConfigProvider {
    fn default() -> Self {
        Self {
            providers: RwLock::new(default_providers()),
        }
    }
}

impl ModelConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an empty table plus custom entries, without the built-in
    /// defaults.
    pub fn with_custom(custom: HashMap<String, ModelConfig>) -> Self {
        Self {
            providers: RwLock::new(custom),
        }
    }

    pub fn add_model(&self, config: ModelConfig) {
        self.providers.write().unwrap().insert(config.name.clone(), config);
    }

    pub fn remove_model(&self, name: &str) {
        self.providers.write().unwrap().remove(name);
    }

    pub fn list_platforms(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap();
        let mut platforms: Vec<String> = providers
            .values()
            .map(|c| c.provider.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        platforms.sort();
        platforms
    }

    pub fn models_by_platform(&self, platform: &str) -> Vec<String> {
        let providers = self.providers.read().unwrap();
        let mut names: Vec<String> = providers
            .values()
            .filter(|c| c.provider == platform)
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names
    }
}

impl ModelProvider for ModelConfigProvider {
    fn get_model(&self, name: &str) -> Option<ModelConfig> {
        let providers = self.providers.read().unwrap();
        Some(
            providers
                .get(name)
                .cloned()
                .unwrap_or_else(|| openai_compatible_default(name)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_resolves_to_ollama() {
        let provider = ModelConfigProvider::new();
        let config = provider.get_model("qwen2.5").unwrap();
        assert_eq!(config.provider, "ollama");
    }

    #[test]
    fn unknown_model_falls_back_to_openai_compatible() {
        let provider = ModelConfigProvider::new();
        let config = provider.get_model("some-custom-model").unwrap();
        assert_eq!(config.provider, "openai_compatible");
    }

    #[test]
    fn add_and_remove_model() {
        let provider = ModelConfigProvider::new();
        provider.add_model(ModelConfig {
            name: "my-model".to_string(),
            provider: "anthropic".to_string(),
            base_url: Some("https://api.anthropic.com".to_string()),
            api_key: None,
            extra: json!({}),
        });
        assert_eq!(provider.get_model("my-model").unwrap().provider, "anthropic");
        provider.remove_model("my-model");
        assert_eq!(provider.get_model("my-model").unwrap().provider, "openai_compatible");
    }

    #[test]
    fn list_platforms_includes_ollama() {
        let provider = ModelConfigProvider::new();
        assert!(provider.list_platforms().contains(&"ollama".to_string()));
    }
}

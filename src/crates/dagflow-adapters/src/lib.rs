//! Built-in task adapters for `dagflow-core`.
//!
//! The core engine knows nothing about HTTP, JSON, or LLM APIs — it only
//! knows the [`dagflow_core::Adapter`] trait. This crate supplies the
//! concrete adapters a DSL document's `func` field actually names, plus a
//! [`ModelProvider`](dagflow_core::ModelProvider) implementation so the LLM
//! adapters have somewhere to resolve a model name to an endpoint.
//!
//! # Built-in functions
//!
//! - `http_request_get`, `http_request_post_json`, `http_request` — generic HTTP calls.
//! - `string_to_json`, `json_to_string` — JSON codec.
//! - `text_process` — upper/lower/reverse text-case operations.
//! - `data_merge` — positional + keyword argument combiner.
//! - `calculate` — restricted arithmetic expression evaluator.
//! - `llm_api_call`, `llm_simple_call`, `llm_chat_call` — LLM calls, dispatched
//!   by provider through [`ModelConfigProvider`].
//!
//! # Example
//!
//! ```
//! use dagflow_core::Engine;
//! use std::sync::Arc;
//!
//! let mut engine = Engine::new();
//! dagflow_adapters::install_builtins(
//!     &mut engine,
//!     Arc::new(dagflow_adapters::ModelConfigProvider::new()),
//! );
//! assert!(engine.list_functions().contains(&"calculate".to_string()));
//! ```

pub mod calculate;
pub mod data;
pub mod error;
pub mod http;
pub mod llm;
pub mod model_config;

pub use calculate::Calculate;
pub use data::{DataMerge, JsonToString, StringToJson, TextProcess};
pub use error::LlmError;
pub use http::{HttpRequest, HttpRequestGet, HttpRequestPostJson};
pub use llm::{LlmApiCall, LlmChatCall, LlmSimpleCall};
pub use model_config::ModelConfigProvider;

use dagflow_core::{Engine, ModelProvider};
use std::sync::Arc;

/// Register every built-in adapter under its canonical name and install
/// `provider` as the engine's [`ModelProvider`].
///
/// This is the one-stop call `dagflow-cli` (and any embedder) makes after
/// `Engine::new()`; registering functions piecemeal via
/// `Engine::register_function` remains available for callers who want a
/// narrower surface.
pub fn install_builtins(engine: &mut Engine, provider: Arc<dyn ModelProvider>) {
    engine.set_provider(provider);
    engine.register_function("http_request_get", Arc::new(HttpRequestGet::default()));
    engine.register_function("http_request_post_json", Arc::new(HttpRequestPostJson::default()));
    engine.register_function("http_request", Arc::new(HttpRequest::default()));
    engine.register_function("string_to_json", Arc::new(StringToJson));
    engine.register_function("json_to_string", Arc::new(JsonToString));
    engine.register_function("text_process", Arc::new(TextProcess));
    engine.register_function("data_merge", Arc::new(DataMerge));
    engine.register_function("calculate", Arc::new(Calculate));
    engine.register_function("llm_api_call", Arc::new(LlmApiCall::default()));
    engine.register_function("llm_simple_call", Arc::new(LlmSimpleCall::default()));
    engine.register_function("llm_chat_call", Arc::new(LlmChatCall::default()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_every_built_in_name() {
        let mut engine = Engine::new();
        install_builtins(&mut engine, Arc::new(ModelConfigProvider::new()));
        let names = engine.list_functions();
        for expected in [
            "http_request_get",
            "http_request_post_json",
            "http_request",
            "string_to_json",
            "json_to_string",
            "text_process",
            "data_merge",
            "calculate",
            "llm_api_call",
            "llm_simple_call",
            "llm_chat_call",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }
}

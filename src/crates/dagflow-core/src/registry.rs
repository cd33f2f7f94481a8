//! Function registry (C3) — maps a DSL node's `func` name to an [`Adapter`]
//! implementation, and carries the call-time context adapters need.

use crate::provider::{ModelProvider, NullModelProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// What an adapter expects its parameters to look like. The original engine
/// discovered this at call time via Python's `inspect` module; there is no
/// equivalent reflection in Rust, so adapters declare their own shape.
#[derive(Debug, Clone)]
pub enum ParamSpec {
    /// Accepts exactly these named parameters (plus any positional
    /// arguments the node declares, bound in order).
    Named(Vec<String>),
    /// Accepts an arbitrary parameter bag; the adapter does its own
    /// validation internally (used by generic pass-through adapters like
    /// `data_merge`).
    AcceptsAny,
}

/// Handle passed to every adapter invocation.
pub struct AdapterContext<'a> {
    pub provider: &'a dyn ModelProvider,
    pub node_name: &'a str,
}

/// Errors an adapter call can produce. These become the `error` field of an
/// [`crate::record::ExecutionRecord`] — they never abort the graph.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("missing required parameter '{0}'")]
    MissingParam(String),
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("{0}")]
    Other(String),
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// A named, callable function a graph node can invoke.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn params(&self) -> ParamSpec;

    async fn call(
        &self,
        ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value>;
}

/// Maps function names to adapters. Cloning a registry is cheap: adapters
/// are stored behind `Arc` and shared, not duplicated.
#[derive(Clone)]
pub struct FunctionRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
    provider: Arc<dyn ModelProvider>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self {
            adapters: HashMap::new(),
            provider: Arc::new(NullModelProvider),
        }
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            adapters: HashMap::new(),
            provider,
        }
    }

    pub fn set_provider(&mut self, provider: Arc<dyn ModelProvider>) {
        self.provider = provider;
    }

    pub fn provider(&self) -> Arc<dyn ModelProvider> {
        Arc::clone(&self.provider)
    }

    /// Register a function under `name`, replacing any prior registration.
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

//! Engine facade (C7) — the single entry point composing the DSL compiler,
//! function registry, and scheduler.

use crate::dsl::{self, DslDocument, DslType};
use crate::node::NodeSpec;
use crate::placeholder;
use crate::provider::ModelProvider;
use crate::record::ExecutionRecord;
use crate::registry::{Adapter, FunctionRegistry};
use crate::scheduler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The result of `Engine::execute`/`execute_simple`: every node's
/// [`ExecutionRecord`] plus the bookkeeping spec.md §4.7 asks an envelope
/// to carry.
///
/// A compile failure (unknown function, dangling dependency, cycle, parse
/// error) is reported here too, rather than as an `Err` — `results` is
/// empty and `error` describes the problem, matching §6's "Envelope on
/// compile failure" contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    /// The original document, echoed back as parsed JSON/YAML.
    pub dsl: Value,
    /// Runtime inputs merged over the document's declared `inputs`
    /// (runtime wins on key collision).
    pub inputs: HashMap<String, Value>,
    pub results: HashMap<String, ExecutionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    fn compile_failure(err: impl std::fmt::Display, inputs: HashMap<String, Value>) -> Self {
        Self {
            success: false,
            dsl: Value::Null,
            inputs,
            results: HashMap::new(),
            metadata: None,
            output: None,
            error: Some(err.to_string()),
        }
    }

    fn from_run(
        doc: &DslDocument,
        inputs: HashMap<String, Value>,
        results: HashMap<String, ExecutionRecord>,
    ) -> Self {
        let success = results.values().all(ExecutionRecord::is_success);
        let error = if success {
            None
        } else {
            let failed: Vec<&str> = results
                .iter()
                .filter(|(_, r)| !r.is_success())
                .map(|(name, _)| name.as_str())
                .collect();
            Some(format!("{} of {} node(s) failed: {}", failed.len(), results.len(), failed.join(", ")))
        };

        let output = doc.output.as_ref().map(|projection| {
            let mut context: HashMap<String, Value> = inputs.clone();
            for (name, record) in &results {
                let mut entry = serde_json::to_value(record).unwrap_or(Value::Null);
                if let Value::Object(ref mut map) = entry {
                    map.insert("output".to_string(), record.output_or_null());
                }
                context.insert(name.clone(), entry);
            }
            placeholder::resolve(projection, &context)
        });

        Self {
            success,
            dsl: serde_json::to_value(doc).unwrap_or(Value::Null),
            inputs,
            results,
            metadata: doc.metadata.clone(),
            output,
            error,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExecutionRecord> {
        self.results.get(name)
    }
}

/// The engine: a function registry plus the machinery to compile a DSL
/// document and run it.
///
/// `Engine::new` starts with an empty registry and a [`crate::provider::NullModelProvider`];
/// `dagflow_adapters::install_builtins` is the usual way to populate both
/// with the crate's built-in functions.
pub struct Engine {
    registry: FunctionRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: FunctionRegistry::new(),
        }
    }

    pub fn with_provider(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            registry: FunctionRegistry::with_provider(provider),
        }
    }

    pub fn set_provider(&mut self, provider: Arc<dyn ModelProvider>) {
        self.registry.set_provider(provider);
    }

    pub fn register_function(&mut self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.registry.register(name, adapter);
    }

    pub fn list_functions(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    /// Compile `text` as `dsl_type`, merge `inputs` over the document's own
    /// declared `inputs` (runtime wins on collision — §9's first Open
    /// Question), run the scheduler, and assemble the envelope (§4.7).
    pub async fn execute(&self, text: &str, inputs: HashMap<String, Value>, dsl_type: DslType) -> Envelope {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("execute", run_id = %run_id);
        let _enter = span.enter();

        let (doc, nodes) = match dsl::compile(text, dsl_type, &self.registry) {
            Ok(compiled) => compiled,
            Err(err) => {
                tracing::error!(error = %err, "compile failed");
                return Envelope::compile_failure(err, inputs);
            }
        };

        let mut merged_inputs = doc.inputs.clone();
        merged_inputs.extend(inputs);

        tracing::debug!(nodes = nodes.len(), "running graph");
        let results = scheduler::run(&nodes, &self.registry, &merged_inputs).await;
        Envelope::from_run(&doc, merged_inputs, results)
    }

    pub async fn execute_file(
        &self,
        path: impl AsRef<Path>,
        inputs: HashMap<String, Value>,
        dsl_type: DslType,
    ) -> Envelope {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => return Envelope::compile_failure(err, inputs),
        };
        self.execute(&text, inputs, dsl_type).await
    }

    /// Convenience operation (spec.md §4.7): build a one-node graph calling
    /// the registry's `llm_simple_call` with `user_input` as its sole
    /// argument, and run it through `execute`. Used by smoke tests.
    pub async fn execute_simple(&self, user_input: impl Into<Value>, api_key: Option<String>) -> Envelope {
        let doc = serde_json::json!({
            "executors": [{
                "name": "simple",
                "func": "llm_simple_call",
                "custom_vars": {"user_input": user_input.into()},
            }],
        });
        let mut inputs = HashMap::new();
        if let Some(key) = api_key {
            inputs.insert("api_key".to_string(), Value::String(key));
        }
        self.execute(&doc.to_string(), inputs, DslType::Json).await
    }

    /// Run an already-compiled node list directly, bypassing the DSL layer
    /// entirely. Useful for building graphs programmatically.
    pub async fn run_compiled(&self, nodes: &[NodeSpec], inputs: HashMap<String, Value>) -> HashMap<String, ExecutionRecord> {
        scheduler::run(nodes, &self.registry, &inputs).await
    }
}

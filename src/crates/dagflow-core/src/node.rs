//! Executor node (C4) — binds one DSL node spec to its adapter, resolves
//! its parameters against the shared context, and produces an
//! [`ExecutionRecord`].

use crate::placeholder;
use crate::provider::ModelProvider;
use crate::record::ExecutionRecord;
use crate::registry::{AdapterError, FunctionRegistry, ParamSpec};
use serde_json::Value;
use std::collections::HashMap;

/// A single node's static declaration, as lowered from the DSL document.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub func: String,
    /// Free-form label, not interpreted by the core. Defaults to `"default"`.
    pub exec_type: String,
    pub depends_on: Vec<String>,
    /// Named parameters declared in the DSL, resolved against context
    /// before the call. Preserved verbatim (pre-resolution) on the
    /// resulting [`ExecutionRecord::custom_vars`].
    pub custom_vars: HashMap<String, Value>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, func: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            func: func.into(),
            exec_type: "default".to_string(),
            depends_on: Vec::new(),
            custom_vars: HashMap::new(),
        }
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn exec_type(mut self, exec_type: impl Into<String>) -> Self {
        self.exec_type = exec_type.into();
        self
    }

    pub fn custom_var(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_vars.insert(key.into(), value);
        self
    }
}

/// Discard any named argument whose name is neither a declared formal
/// parameter nor absorbed by an accepts-any adapter. This is the static
/// replacement for the source's runtime introspection of a callable's
/// formal parameters (see the Design Notes on "Dynamic argument merging").
fn filter_params(params: &ParamSpec, named: HashMap<String, Value>) -> HashMap<String, Value> {
    match params {
        ParamSpec::AcceptsAny => named,
        ParamSpec::Named(formal) => named
            .into_iter()
            .filter(|(k, _)| formal.contains(k))
            .collect(),
    }
}

/// Run one node to completion: resolve placeholders, merge parameters,
/// invoke the adapter, and capture the outcome.
///
/// `positional` holds the already-resolved `output` of every dependency, in
/// `depends_on` declaration order — the scheduler gathers these before
/// calling in (see §4.5 of the engine's argument-assembly policy).
/// `context` holds prior nodes' records (by name) plus every runtime input
/// key, used to resolve `${name.field}` references in `custom_vars`.
/// `runtime_kwargs` are additional named parameters supplied at execution
/// time for this specific node; on key collision they win over the node's
/// own `custom_vars`, per the ordering rule: `custom_vars (resolved) <
/// runtime kwargs`.
pub async fn execute(
    spec: &NodeSpec,
    registry: &FunctionRegistry,
    positional: &[Value],
    context: &HashMap<String, Value>,
    runtime_kwargs: &HashMap<String, Value>,
) -> ExecutionRecord {
    let start = chrono::Utc::now();

    let mut merged_params: HashMap<String, Value> = spec
        .custom_vars
        .iter()
        .map(|(k, v)| (k.clone(), placeholder::resolve(v, context)))
        .collect();
    for (k, v) in runtime_kwargs {
        merged_params.insert(k.clone(), placeholder::resolve(v, context));
    }

    let adapter = match registry.get(&spec.func) {
        Some(a) => a,
        None => {
            let end = chrono::Utc::now();
            return ExecutionRecord::fail(
                &spec.name,
                format!("unknown function '{}'", spec.func),
                spec.custom_vars.clone(),
                merged_params,
                start,
                end,
            );
        }
    };

    // What's recorded as `resolved_params` (spec.md §4.1) is what the
    // function actually receives — after filtering, not before.
    let call_params = filter_params(&adapter.params(), merged_params);

    let provider: &dyn ModelProvider = &*registry.provider();
    let adapter_ctx = crate::registry::AdapterContext {
        provider,
        node_name: &spec.name,
    };

    let span = tracing::info_span!("node", name = %spec.name, func = %spec.func, exec_type = %spec.exec_type);
    let _enter = span.enter();
    tracing::debug!(deps = spec.depends_on.len(), "dispatching node");

    let result = adapter.call(&adapter_ctx, positional, &call_params).await;
    let end = chrono::Utc::now();

    match result {
        Ok(output) => {
            tracing::info!("node completed successfully");
            ExecutionRecord::ok(
                &spec.name,
                output,
                spec.custom_vars.clone(),
                call_params,
                start,
                end,
            )
        }
        Err(err) => {
            let message = describe_error(&err);
            tracing::warn!(error = %message, "node failed");
            ExecutionRecord::fail(&spec.name, message, spec.custom_vars.clone(), call_params, start, end)
        }
    }
}

fn describe_error(err: &AdapterError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Adapter, AdapterContext, ParamSpec};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Double;

    #[async_trait]
    impl Adapter for Double {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            positional: &[Value],
            _named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            let n = positional
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| AdapterError::MissingParam("n".into()))?;
            Ok(Value::from(n * 2))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Adapter for AlwaysFails {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            _positional: &[Value],
            _named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            Err(AdapterError::Other("boom".into()))
        }
    }

    struct NamedOnly;

    #[async_trait]
    impl Adapter for NamedOnly {
        fn params(&self) -> ParamSpec {
            ParamSpec::Named(vec!["x".to_string()])
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            _positional: &[Value],
            named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            Ok(serde_json::json!(named.keys().cloned().collect::<Vec<_>>()))
        }
    }

    fn registry() -> FunctionRegistry {
        let mut reg = FunctionRegistry::new();
        reg.register("double", Arc::new(Double));
        reg.register("fail", Arc::new(AlwaysFails));
        reg.register("named_only", Arc::new(NamedOnly));
        reg
    }

    #[tokio::test]
    async fn executes_successfully() {
        let spec = NodeSpec::new("n1", "double");
        let rec = execute(&spec, &registry(), &[Value::from(21)], &HashMap::new(), &HashMap::new()).await;
        assert!(rec.is_success());
        assert_eq!(rec.output, Some(Value::from(42)));
    }

    #[tokio::test]
    async fn captures_adapter_failure() {
        let spec = NodeSpec::new("n1", "fail");
        let rec = execute(&spec, &registry(), &[], &HashMap::new(), &HashMap::new()).await;
        assert!(!rec.is_success());
        assert_eq!(rec.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn unknown_function_fails_gracefully() {
        let spec = NodeSpec::new("n1", "nonexistent");
        let rec = execute(&spec, &registry(), &[], &HashMap::new(), &HashMap::new()).await;
        assert!(!rec.is_success());
        assert!(rec.error.unwrap().contains("unknown function"));
    }

    #[tokio::test]
    async fn resolves_placeholders_in_custom_vars() {
        let mut ctx = HashMap::new();
        ctx.insert("prev".to_string(), serde_json::json!({"output": 10}));
        let spec = NodeSpec::new("n1", "named_only").custom_var("x", serde_json::json!("${prev.output}"));
        let rec = execute(&spec, &registry(), &[], &ctx, &HashMap::new()).await;
        assert!(rec.is_success());
        assert_eq!(rec.resolved_params.get("x"), Some(&serde_json::json!(10)));
    }

    #[tokio::test]
    async fn runtime_kwargs_win_over_custom_vars() {
        let spec = NodeSpec::new("n1", "named_only").custom_var("x", Value::from(1));
        let mut kwargs = HashMap::new();
        kwargs.insert("x".to_string(), Value::from(2));
        let rec = execute(&spec, &registry(), &[], &HashMap::new(), &kwargs).await;
        assert_eq!(rec.resolved_params.get("x"), Some(&Value::from(2)));
    }

    #[tokio::test]
    async fn named_adapter_drops_extraneous_keys() {
        let spec = NodeSpec::new("n1", "named_only")
            .custom_var("x", Value::from(1))
            .custom_var("stray", Value::from("unwanted"));
        let rec = execute(&spec, &registry(), &[], &HashMap::new(), &HashMap::new()).await;
        assert_eq!(rec.output, Some(serde_json::json!(["x"])));
    }
}

//! DSL compiler (C6) — parses a workflow document (JSON or YAML) into
//! [`NodeSpec`]s and validates it before a single node runs.

use crate::error::{GraphError, Result};
use crate::node::NodeSpec;
use crate::registry::FunctionRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Which surface syntax to parse a document as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DslType {
    Json,
    Yaml,
    /// Try JSON first; fall back to YAML on parse failure.
    #[default]
    Auto,
}

/// Top-level workflow document (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslDocument {
    /// Opaque; surfaced verbatim in the result envelope.
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Seeds the running context with key -> value pairs; overridable by
    /// runtime inputs supplied to `Engine::execute`.
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    pub executors: Vec<DslExecutor>,
    /// Post-run projection, placeholder-resolved against the final context
    /// once every node has completed.
    #[serde(default)]
    pub output: Option<Value>,
}

/// One node's declaration in the DSL surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslExecutor {
    pub name: String,
    pub func: String,
    #[serde(default = "default_exec_type")]
    pub exec_type: String,
    #[serde(default)]
    pub custom_vars: HashMap<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn default_exec_type() -> String {
    "default".to_string()
}

/// Parse `text` as `dsl_type`, validate it against `registry`, and lower
/// it to the node list the scheduler runs.
pub fn compile(text: &str, dsl_type: DslType, registry: &FunctionRegistry) -> Result<(DslDocument, Vec<NodeSpec>)> {
    let doc = parse(text, dsl_type)?;
    validate(&doc, registry)?;
    let nodes = lower(&doc);
    Ok((doc, nodes))
}

/// Read a document from disk and compile it. `dsl_type` of `Auto` tries
/// JSON first, then YAML, regardless of file extension.
pub fn compile_file(
    path: impl AsRef<Path>,
    dsl_type: DslType,
    registry: &FunctionRegistry,
) -> Result<(DslDocument, Vec<NodeSpec>)> {
    let text = std::fs::read_to_string(path)?;
    compile(&text, dsl_type, registry)
}

fn parse(text: &str, dsl_type: DslType) -> Result<DslDocument> {
    match dsl_type {
        DslType::Json => {
            serde_json::from_str(text).map_err(|e| GraphError::Parse(format!("JSON: {e}")))
        }
        DslType::Yaml => {
            serde_yaml::from_str(text).map_err(|e| GraphError::Parse(format!("YAML: {e}")))
        }
        DslType::Auto => match serde_json::from_str::<DslDocument>(text) {
            Ok(doc) => Ok(doc),
            Err(json_err) => serde_yaml::from_str(text)
                .map_err(|yaml_err| {
                    GraphError::Parse(format!("JSON: {json_err}; YAML: {yaml_err}"))
                }),
        },
    }
}

/// Structural validation (spec.md §4.6): no duplicate names, every `func`
/// resolves through `registry`, no dangling `depends_on` references, and
/// no cycles.
///
/// Cycle detection is a full Kahn's-algorithm pass independent of the
/// scheduler: it counts in-degrees and repeatedly removes zero-in-degree
/// nodes. Anything left over after that pass participates in a cycle.
fn validate(doc: &DslDocument, registry: &FunctionRegistry) -> Result<()> {
    if doc.executors.is_empty() {
        return Err(GraphError::validation("document declares no executors"));
    }

    let mut seen = HashSet::new();
    for n in &doc.executors {
        if !seen.insert(n.name.as_str()) {
            return Err(GraphError::validation(format!(
                "duplicate node name '{}'",
                n.name
            )));
        }
    }

    for n in &doc.executors {
        if !registry.contains(&n.func) {
            return Err(GraphError::UnknownFunction(n.func.clone()));
        }
    }

    for n in &doc.executors {
        for dep in &n.depends_on {
            if !seen.contains(dep.as_str()) {
                return Err(GraphError::validation(format!(
                    "node '{}' depends on undeclared node '{}'",
                    n.name, dep
                )));
            }
        }
    }

    let mut in_degree: HashMap<&str, usize> = doc
        .executors
        .iter()
        .map(|n| (n.name.as_str(), n.depends_on.len()))
        .collect();
    let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
    for n in &doc.executors {
        for dep in &n.depends_on {
            reverse.entry(dep.as_str()).or_default().push(n.name.as_str());
        }
    }

    let mut queue: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&name, _)| name)
        .collect();
    let mut visited = 0usize;
    while let Some(name) = queue.pop() {
        visited += 1;
        if let Some(dependents) = reverse.get(name) {
            for &dep_name in dependents {
                let counter = in_degree.get_mut(dep_name).unwrap();
                *counter -= 1;
                if *counter == 0 {
                    queue.push(dep_name);
                }
            }
        }
    }

    if visited != doc.executors.len() {
        let cyclic: Vec<String> = in_degree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        return Err(GraphError::CyclicGraph(cyclic));
    }

    Ok(())
}

fn lower(doc: &DslDocument) -> Vec<NodeSpec> {
    doc.executors
        .iter()
        .map(|n| NodeSpec {
            name: n.name.clone(),
            func: n.func.clone(),
            exec_type: n.exec_type.clone(),
            depends_on: n.depends_on.clone(),
            custom_vars: n.custom_vars.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Adapter, AdapterContext, AdapterResult, ParamSpec};
    use async_trait::async_trait;
    use std::collections::HashMap as Map;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl Adapter for Noop {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }
        async fn call(&self, _: &AdapterContext<'_>, _: &[Value], _: &Map<String, Value>) -> AdapterResult<Value> {
            Ok(Value::Null)
        }
    }

    fn registry() -> FunctionRegistry {
        let mut reg = FunctionRegistry::new();
        reg.register("identity", Arc::new(Noop));
        reg
    }

    #[test]
    fn compiles_linear_json() {
        let text = r#"{
            "executors": [
                {"name": "a", "func": "identity"},
                {"name": "b", "func": "identity", "depends_on": ["a"]}
            ]
        }"#;
        let (_, nodes) = compile(text, DslType::Json, &registry()).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn compiles_yaml() {
        let text = "executors:\n  - name: a\n    func: identity\n  - name: b\n    func: identity\n    depends_on: [a]\n";
        let (_, nodes) = compile(text, DslType::Yaml, &registry()).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn auto_falls_back_to_yaml() {
        let text = "executors:\n  - name: a\n    func: identity\n";
        let (_, nodes) = compile(text, DslType::Auto, &registry()).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn rejects_duplicate_names() {
        let text = r#"{"executors": [{"name": "a", "func": "identity"}, {"name": "a", "func": "identity"}]}"#;
        let err = compile(text, DslType::Json, &registry()).unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn rejects_dangling_dependency() {
        let text = r#"{"executors": [{"name": "a", "func": "identity", "depends_on": ["missing"]}]}"#;
        let err = compile(text, DslType::Json, &registry()).unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn rejects_cycle() {
        let text = r#"{"executors": [
            {"name": "a", "func": "identity", "depends_on": ["b"]},
            {"name": "b", "func": "identity", "depends_on": ["a"]}
        ]}"#;
        let err = compile(text, DslType::Json, &registry()).unwrap_err();
        assert!(matches!(err, GraphError::CyclicGraph(_)));
    }

    #[test]
    fn rejects_unknown_function_at_compile_time() {
        let text = r#"{"executors": [{"name": "a", "func": "nope"}]}"#;
        let err = compile(text, DslType::Json, &registry()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownFunction(name) if name == "nope"));
    }

    #[test]
    fn rejects_unparseable_document() {
        let err = compile("not valid { json or yaml :::", DslType::Json, &registry()).unwrap_err();
        assert!(matches!(err, GraphError::Parse(_)));
    }

    #[test]
    fn exec_type_defaults_to_default_label() {
        let text = r#"{"executors": [{"name": "a", "func": "identity"}]}"#;
        let (_, nodes) = compile(text, DslType::Json, &registry()).unwrap();
        assert_eq!(nodes[0].exec_type, "default");
    }

    #[test]
    fn parses_metadata_inputs_and_output() {
        let text = r#"{
            "metadata": {"owner": "team-x"},
            "inputs": {"who": "world"},
            "executors": [{"name": "a", "func": "identity"}],
            "output": {"greeting": "${who}"}
        }"#;
        let doc = parse(text, DslType::Json).unwrap();
        assert_eq!(doc.metadata, Some(serde_json::json!({"owner": "team-x"})));
        assert_eq!(doc.inputs.get("who"), Some(&serde_json::json!("world")));
        assert!(doc.output.is_some());
    }
}

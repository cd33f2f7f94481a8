//! DAG scheduler (C5) — runs every node exactly once, as soon as its
//! dependencies have all completed, with no more concurrency than the
//! graph's own fan-out actually permits.
//!
//! Concurrency comes from polling a [`FuturesUnordered`] of in-flight node
//! futures on the current task — "await whichever finishes first, wake its
//! dependents" — rather than spawning OS threads or `tokio::spawn`ed tasks.
//! This mirrors `asyncio.wait(..., return_when=FIRST_COMPLETED)` in the
//! engine this crate is modeled on.

use crate::node::{self, NodeSpec};
use crate::record::ExecutionRecord;
use crate::registry::FunctionRegistry;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Render one finished node's record into its context-snapshot entry: the
/// full serialized record, with `output` forced present (`null` on
/// failure) so `${name.output}` always resolves rather than falling back
/// to the whole record object.
fn context_entry(record: &ExecutionRecord) -> Value {
    let mut entry = serde_json::to_value(record).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = entry {
        map.insert("output".to_string(), record.output_or_null());
    }
    entry
}

/// Run `nodes` to completion against `registry`.
///
/// `runtime_inputs` does double duty, matching §4.5: it seeds the running
/// context (every key is present from the start, for `${name.field}`
/// lookups) *and* is passed to every node as its caller-supplied named
/// arguments — which, per the ordering rule in §4.4a, win over that node's
/// own `custom_vars` on key collision. There is one shared set of runtime
/// inputs for the whole graph, not one per node; `node::execute`'s
/// parameter filtering (via each adapter's `ParamSpec`) is what keeps an
/// irrelevant key from reaching a node that doesn't declare it.
///
/// Assumes `nodes` is already acyclic and every `depends_on` reference
/// resolves to a node in the slice — both are enforced by
/// [`crate::dsl`]'s compile-time validation, so the scheduler itself does
/// not re-check them.
pub async fn run(
    nodes: &[NodeSpec],
    registry: &FunctionRegistry,
    runtime_inputs: &HashMap<String, Value>,
) -> HashMap<String, ExecutionRecord> {
    let node_by_name: HashMap<&str, &NodeSpec> =
        nodes.iter().map(|n| (n.name.as_str(), n)).collect();

    let mut remaining_deps: HashMap<String, usize> = nodes
        .iter()
        .map(|n| (n.name.clone(), n.depends_on.len()))
        .collect();

    let mut reverse_deps: HashMap<String, Vec<String>> = HashMap::new();
    for n in nodes {
        for dep in &n.depends_on {
            reverse_deps.entry(dep.clone()).or_default().push(n.name.clone());
        }
    }

    let context: Arc<Mutex<HashMap<String, Value>>> =
        Arc::new(Mutex::new(runtime_inputs.clone()));

    type NodeFuture =
        std::pin::Pin<Box<dyn std::future::Future<Output = (String, ExecutionRecord)> + Send>>;

    fn spawn_future(
        spec: NodeSpec,
        registry: FunctionRegistry,
        positional: Vec<Value>,
        context: Arc<Mutex<HashMap<String, Value>>>,
        kwargs: HashMap<String, Value>,
    ) -> NodeFuture {
        Box::pin(async move {
            let snapshot = context.lock().await.clone();
            let record = node::execute(&spec, &registry, &positional, &snapshot, &kwargs).await;
            (spec.name.clone(), record)
        })
    }

    let mut in_flight: FuturesUnordered<NodeFuture> = FuturesUnordered::new();
    let mut results: HashMap<String, ExecutionRecord> = HashMap::new();

    // Gather the `output` of every dependency of `name`, in declared
    // `depends_on` order, as positional arguments (§4.5).
    let gather_positional = |name: &str, results: &HashMap<String, ExecutionRecord>| -> Vec<Value> {
        node_by_name[name]
            .depends_on
            .iter()
            .map(|dep| results[dep].output_or_null())
            .collect()
    };

    for n in nodes {
        if remaining_deps[&n.name] == 0 {
            in_flight.push(spawn_future(
                n.clone(),
                registry.clone(),
                Vec::new(),
                Arc::clone(&context),
                runtime_inputs.clone(),
            ));
        }
    }

    while let Some((name, record)) = in_flight.next().await {
        context.lock().await.insert(name.clone(), context_entry(&record));
        results.insert(name.clone(), record);

        if let Some(dependents) = reverse_deps.get(&name) {
            for dep_name in dependents.clone() {
                let counter = remaining_deps.get_mut(&dep_name).expect("tracked node");
                *counter -= 1;
                if *counter == 0 {
                    let spec = (*node_by_name.get(dep_name.as_str()).expect("node exists")).clone();
                    let positional = gather_positional(&dep_name, &results);
                    in_flight.push(spawn_future(
                        spec,
                        registry.clone(),
                        positional,
                        Arc::clone(&context),
                        runtime_inputs.clone(),
                    ));
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Adapter, AdapterContext, AdapterError, ParamSpec};
    use async_trait::async_trait;

    struct Identity;

    #[async_trait]
    impl Adapter for Identity {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            positional: &[Value],
            _named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            Ok(positional.first().cloned().unwrap_or(Value::Null))
        }
    }

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
            let n = positional.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::from(n * 2))
        }
    }

    struct Triple;

    #[async_trait]
    impl Adapter for Triple {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            positional: &[Value],
            _named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            let n = positional.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::from(n * 3))
        }
    }

    struct Merge;

    #[async_trait]
    impl Adapter for Merge {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            positional: &[Value],
            _named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            let d = positional.first().and_then(Value::as_i64).unwrap_or(0);
            let t = positional.get(1).and_then(Value::as_i64).unwrap_or(0);
            Ok(serde_json::json!({"sum": d + t, "double": d, "triple": t}))
        }
    }

    struct Fails;

    #[async_trait]
    impl Adapter for Fails {
        fn params(&self) -> ParamSpec {
            ParamSpec::AcceptsAny
        }

        async fn call(
            &self,
            _ctx: &AdapterContext<'_>,
            _positional: &[Value],
            _named: &HashMap<String, Value>,
        ) -> Result<Value, AdapterError> {
            Err(AdapterError::Other("broken".into()))
        }
    }

    fn registry() -> FunctionRegistry {
        let mut reg = FunctionRegistry::new();
        reg.register("identity", Arc::new(Identity));
        reg.register("double", Arc::new(Double));
        reg.register("triple", Arc::new(Triple));
        reg.register("merge", Arc::new(Merge));
        reg.register("fails", Arc::new(Fails));
        reg
    }

    #[tokio::test]
    async fn linear_chain_propagates_output_via_positional_deps() {
        let nodes = vec![
            NodeSpec::new("a", "double").custom_var("seed", Value::from(5)),
            NodeSpec::new("b", "double").depends_on(["a"]),
            NodeSpec::new("c", "double").depends_on(["b"]),
        ];
        let results = run(&nodes, &registry(), &HashMap::new()).await;
        assert_eq!(results.len(), 3);
        assert!(results.values().all(|r| r.is_success()));
        // a has no deps so its positional list is empty -> 0*2; b, c double it onward.
        assert_eq!(results["a"].output, Some(Value::from(0)));
        assert_eq!(results["c"].output, Some(Value::from(0)));
    }

    #[tokio::test]
    async fn diamond_merges_both_branches_with_automatic_positional_gather() {
        let nodes = vec![
            NodeSpec::new("start", "identity"),
            NodeSpec::new("double", "double").depends_on(["start"]),
            NodeSpec::new("triple", "triple").depends_on(["start"]),
            NodeSpec::new("merge", "merge").depends_on(["double", "triple"]),
        ];
        let mut inputs = HashMap::new();
        inputs.insert("start".to_string(), Value::from(3));
        let results = run(&nodes, &registry(), &inputs).await;
        assert_eq!(results.len(), 4);
        assert!(results.values().all(|r| r.is_success()));
    }

    #[tokio::test]
    async fn downstream_of_failure_still_runs_with_null() {
        let nodes = vec![
            NodeSpec::new("a", "fails"),
            NodeSpec::new("b", "identity").depends_on(["a"]),
        ];
        let results = run(&nodes, &registry(), &HashMap::new()).await;
        assert!(!results["a"].is_success());
        assert!(results["b"].is_success());
        assert_eq!(results["b"].output, Some(Value::Null));
    }

    #[tokio::test]
    async fn runtime_inputs_are_visible_in_context() {
        let nodes = vec![NodeSpec::new("a", "identity").custom_var("x", serde_json::json!("${who.field}"))];
        let mut inputs = HashMap::new();
        inputs.insert("who".to_string(), serde_json::json!("world"));
        let results = run(&nodes, &registry(), &inputs).await;
        assert_eq!(results["a"].resolved_params.get("x"), Some(&serde_json::json!("world")));
    }
}

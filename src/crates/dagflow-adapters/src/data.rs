//! Data-shaping adapters: `string_to_json`, `json_to_string`, `text_process`,
//! `data_merge`.

use async_trait::async_trait;
use dagflow_core::{Adapter, AdapterContext, AdapterError, AdapterResult, ParamSpec};
use serde_json::{json, Value};
use std::collections::HashMap;

fn arg0(positional: &[Value], named: &HashMap<String, Value>, key: &str) -> Option<Value> {
    positional.first().cloned().or_else(|| named.get(key).cloned())
}

/// `string_to_json(s) -> Value`, parsing `s` as JSON.
#[derive(Default)]
pub struct StringToJson;

#[async_trait]
impl Adapter for StringToJson {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["s".into()])
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let s = arg0(positional, named, "s")
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| AdapterError::MissingParam("s".to_string()))?;
        serde_json::from_str(&s).map_err(|e| AdapterError::InvalidParam {
            name: "s".to_string(),
            reason: e.to_string(),
        })
    }
}

/// `json_to_string(obj) -> String`, pretty-printed.
#[derive(Default)]
pub struct JsonToString;

#[async_trait]
impl Adapter for JsonToString {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["obj".into()])
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let obj = arg0(positional, named, "obj").unwrap_or(Value::Null);
        let s = serde_json::to_string_pretty(&obj)
            .map_err(|e| AdapterError::Other(e.to_string()))?;
        Ok(Value::String(s))
    }
}

/// `text_process(text, operation="upper") -> String`, with `operation` one
/// of `upper`/`lower`/`reverse`.
#[derive(Default)]
pub struct TextProcess;

#[async_trait]
impl Adapter for TextProcess {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["text".into(), "operation".into(), "workflow_input".into()])
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let mut text = arg0(positional, named, "text");

        if let Some(Value::Object(workflow_input)) = named.get("workflow_input") {
            if let Some(question) = workflow_input.get("question") {
                text = Some(question.clone());
            }
        }

        let text = match text {
            Some(Value::Object(map)) => map
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map).to_string()),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let operation = named
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("upper");

        let result = match operation {
            "upper" => text.to_uppercase(),
            "lower" => text.to_lowercase(),
            "reverse" => text.chars().rev().collect(),
            _ => text,
        };
        Ok(Value::String(result))
    }
}

/// `data_merge(*args, **kwargs) -> { merged_data, args_count, kwargs_count, total_count }`.
#[derive(Default)]
pub struct DataMerge;

#[async_trait]
impl Adapter for DataMerge {
    fn params(&self) -> ParamSpec {
        ParamSpec::AcceptsAny
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let mut merged = serde_json::Map::new();
        for (i, value) in positional.iter().enumerate() {
            merged.insert(format!("arg_{i}"), value.clone());
        }
        for (k, v) in named {
            merged.insert(k.clone(), v.clone());
        }
        Ok(json!({
            "merged_data": Value::Object(merged),
            "args_count": positional.len(),
            "kwargs_count": named.len(),
            "total_count": positional.len() + named.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagflow_core::NullModelProvider;

    fn ctx() -> AdapterContext<'static> {
        AdapterContext {
            provider: &NullModelProvider,
            node_name: "test",
        }
    }

    #[tokio::test]
    async fn string_to_json_parses() {
        let out = StringToJson
            .call(&ctx(), &[Value::from("{\"a\":1}")], &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[tokio::test]
    async fn text_process_reverses() {
        let mut named = HashMap::new();
        named.insert("operation".to_string(), Value::from("reverse"));
        let out = TextProcess
            .call(&ctx(), &[Value::from("abc")], &named)
            .await
            .unwrap();
        assert_eq!(out, json!("cba"));
    }

    #[tokio::test]
    async fn data_merge_counts_args_and_kwargs() {
        let mut named = HashMap::new();
        named.insert("x".to_string(), Value::from(1));
        let out = DataMerge
            .call(&ctx(), &[Value::from("a"), Value::from("b")], &named)
            .await
            .unwrap();
        assert_eq!(out["args_count"], json!(2));
        assert_eq!(out["kwargs_count"], json!(1));
        assert_eq!(out["total_count"], json!(3));
    }
}

//! Generic HTTP adapters: `http_request_get`, `http_request_post_json`,
//! and the method-dispatching `http_request`.

use crate::error::LlmError;
use async_trait::async_trait;
use dagflow_core::{Adapter, AdapterContext, AdapterError, AdapterResult, ParamSpec};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

fn named_str(named: &HashMap<String, Value>, key: &str) -> Option<String> {
    named.get(key).and_then(Value::as_str).map(str::to_string)
}

fn named_object(named: &HashMap<String, Value>, key: &str) -> Option<Value> {
    named.get(key).filter(|v| v.is_object()).cloned()
}

fn headers_from(named: &HashMap<String, Value>) -> reqwest::header::HeaderMap {
    let mut map = reqwest::header::HeaderMap::new();
    if let Some(Value::Object(headers)) = named.get("headers") {
        for (k, v) in headers {
            if let (Ok(name), Some(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                v.as_str().and_then(|s| reqwest::header::HeaderValue::from_str(s).ok()),
            ) {
                map.insert(name, value);
            }
        }
    }
    map
}

fn require_url(positional: &[Value], named: &HashMap<String, Value>) -> AdapterResult<String> {
    positional
        .first()
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| named_str(named, "url"))
        .ok_or_else(|| AdapterError::MissingParam("url".to_string()))
}

/// `http_request_get(url, params?, headers?) -> String` (the raw response body).
pub struct HttpRequestGet {
    client: Client,
}

impl Default for HttpRequestGet {
    fn default() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl Adapter for HttpRequestGet {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["url".into(), "params".into(), "headers".into()])
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let url = require_url(positional, named)?;
        let mut req = self.client.get(&url).headers(headers_from(named));
        if let Some(Value::Object(params)) = named_object(named, "params") {
            let query: Vec<(String, String)> = params
                .into_iter()
                .map(|(k, v)| (k, v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                .collect();
            req = req.query(&query);
        }
        let resp = req.send().await.map_err(LlmError::from)?;
        let text = resp.text().await.map_err(LlmError::from)?;
        Ok(Value::String(text))
    }
}

/// `http_request_post_json(url, data?, headers?) -> String` (the raw response body).
pub struct HttpRequestPostJson {
    client: Client,
}

impl Default for HttpRequestPostJson {
    fn default() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl Adapter for HttpRequestPostJson {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["url".into(), "data".into(), "headers".into()])
    }

    async fn call(
        &self,
        _ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let url = require_url(positional, named)?;
        let body = named.get("data").cloned().unwrap_or(Value::Null);
        let resp = self
            .client
            .post(&url)
            .headers(headers_from(named))
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;
        let text = resp.text().await.map_err(LlmError::from)?;
        Ok(Value::String(text))
    }
}

/// `http_request(url, method="GET", ...) -> String`, dispatching to GET or
/// POST-JSON by `method`.
#[derive(Default)]
pub struct HttpRequest {
    get: HttpRequestGet,
    post: HttpRequestPostJson,
}

#[async_trait]
impl Adapter for HttpRequest {
    fn params(&self) -> ParamSpec {
        ParamSpec::AcceptsAny
    }

    async fn call(
        &self,
        ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let method = named_str(named, "method").unwrap_or_else(|| "GET".to_string());
        match method.to_uppercase().as_str() {
            "GET" => self.get.call(ctx, positional, named).await,
            "POST" => self.post.call(ctx, positional, named).await,
            other => Err(AdapterError::InvalidParam {
                name: "method".to_string(),
                reason: format!("unsupported HTTP method '{other}'"),
            }),
        }
    }
}

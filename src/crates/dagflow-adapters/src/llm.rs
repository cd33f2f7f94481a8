//! LLM calling adapters: `llm_api_call`, `llm_simple_call`, `llm_chat_call`.
//!
//! All three resolve a model name to a [`dagflow_core::ModelConfig`] through
//! the engine's [`dagflow_core::ModelProvider`] and dispatch to the
//! matching platform's wire format. This mirrors the single
//! `llm_api_call`/`_call_openai_api`/`_call_anthropic_api`/... split the
//! engine this crate is modeled on uses, rather than a typed client per
//! provider.

use crate::error::LlmError;
use async_trait::async_trait;
use dagflow_core::{Adapter, AdapterContext, AdapterError, AdapterResult, ModelConfig, ParamSpec};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;

fn named_str(named: &HashMap<String, Value>, key: &str) -> Option<String> {
    named.get(key).and_then(Value::as_str).map(str::to_string)
}

fn build_messages(prompt: &str, named: &HashMap<String, Value>) -> Vec<Value> {
    if let Some(Value::Array(messages)) = named.get("messages") {
        return messages.clone();
    }
    vec![json!({"role": "user", "content": prompt})]
}

fn supports(config: &ModelConfig, key: &str) -> bool {
    config
        .extra
        .get("supports")
        .and_then(Value::as_array)
        .map(|list| list.iter().any(|v| v.as_str() == Some(key)))
        .unwrap_or(false)
}

fn max_tokens(named: &HashMap<String, Value>, default: u64) -> u64 {
    named.get("max_tokens").and_then(Value::as_u64).unwrap_or(default)
}

async fn call_openai(
    client: &Client,
    api_url: &str,
    model: &str,
    messages: Vec<Value>,
    api_key: Option<&str>,
    config: &ModelConfig,
    named: &HashMap<String, Value>,
) -> AdapterResult<String> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("Content-Type", "application/json".parse().unwrap());
    if let Some(key) = api_key {
        headers.insert(
            "Authorization",
            format!("Bearer {key}").parse().map_err(|_| {
                AdapterError::InvalidParam {
                    name: "api_key".to_string(),
                    reason: "not a valid header value".to_string(),
                }
            })?,
        );
    }

    let mut payload = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens(named, 150),
        "temperature": named.get("temperature").cloned().unwrap_or(json!(0.7)),
        "stream": false,
    });
    for key in ["top_p", "frequency_penalty", "presence_penalty", "stop"] {
        if supports(config, key) {
            if let Some(v) = named.get(key) {
                payload[key] = v.clone();
            }
        }
    }

    let resp = client
        .post(api_url)
        .headers(headers)
        .json(&payload)
        .send()
        .await
        .map_err(LlmError::from)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::Other(format!("OpenAI API error: {status} - {body}")));
    }
    let body: Value = resp.json().await.map_err(LlmError::from)?;
    Ok(body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_string())
}

async fn call_anthropic(
    client: &Client,
    api_url: &str,
    model: &str,
    messages: Vec<Value>,
    api_key: Option<&str>,
    named: &HashMap<String, Value>,
) -> AdapterResult<String> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("Content-Type", "application/json".parse().unwrap());
    headers.insert("anthropic-version", "2023-06-01".parse().unwrap());
    if let Some(key) = api_key {
        headers.insert(
            "x-api-key",
            key.parse().map_err(|_| AdapterError::InvalidParam {
                name: "api_key".to_string(),
                reason: "not a valid header value".to_string(),
            })?,
        );
    }

    let payload = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens(named, 150),
    });

    let resp = client
        .post(api_url)
        .headers(headers)
        .json(&payload)
        .send()
        .await
        .map_err(LlmError::from)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::Other(format!("Anthropic API error: {status} - {body}")));
    }
    let body: Value = resp.json().await.map_err(LlmError::from)?;
    Ok(body["content"][0]["text"].as_str().unwrap_or_default().trim().to_string())
}

async fn call_ollama(
    client: &Client,
    api_url: &str,
    model: &str,
    messages: Vec<Value>,
    named: &HashMap<String, Value>,
) -> AdapterResult<String> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });
    for key in ["temperature", "top_p", "top_k"] {
        if let Some(v) = named.get(key) {
            payload[key] = v.clone();
        }
    }

    let resp = client
        .post(api_url)
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(LlmError::from)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::Other(format!("Ollama API error: {status} - {body}")));
    }
    let body: Value = resp.json().await.map_err(LlmError::from)?;
    Ok(body["message"]["content"].as_str().unwrap_or_default().trim().to_string())
}

async fn call_google(
    client: &Client,
    api_url: &str,
    messages: &[Value],
    api_key: Option<&str>,
    named: &HashMap<String, Value>,
) -> AdapterResult<String> {
    let url = match api_key {
        Some(key) => format!("{api_url}?key={key}"),
        None => api_url.to_string(),
    };

    let contents: Vec<Value> = messages
        .iter()
        .map(|m| {
            let role = if m["role"] == "user" { "user" } else { "model" };
            json!({"parts": [{"text": m["content"]}], "role": role})
        })
        .collect();

    let payload = json!({
        "contents": contents,
        "generationConfig": {
            "maxOutputTokens": max_tokens(named, 150),
            "temperature": named.get("temperature").cloned().unwrap_or(json!(0.7)),
        },
    });

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(LlmError::from)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::Other(format!("Google API error: {status} - {body}")));
    }
    let body: Value = resp.json().await.map_err(LlmError::from)?;
    Ok(body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// `llm_api_call(prompt, model="gpt-3.5-turbo", api_key?, api_url?, ...) -> String`.
#[derive(Default)]
pub struct LlmApiCall {
    client: Client,
}

#[async_trait]
impl Adapter for LlmApiCall {
    fn params(&self) -> ParamSpec {
        ParamSpec::AcceptsAny
    }

    async fn call(
        &self,
        ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let prompt = positional
            .first()
            .and_then(Value::as_str)
            .or_else(|| named.get("prompt").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        let model = named_str(named, "model").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let api_key = named_str(named, "api_key");
        let config = ctx
            .provider
            .get_model(&model)
            .ok_or_else(|| AdapterError::Other(format!("no configuration for model '{model}'")))?;
        let api_url = named_str(named, "api_url").unwrap_or_else(|| {
            config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string())
        });
        let messages = build_messages(&prompt, named);

        let text = match config.provider.as_str() {
            "openai" | "openai_compatible" => {
                call_openai(&self.client, &api_url, &model, messages, api_key.as_deref(), &config, named)
                    .await?
            }
            "anthropic" => {
                call_anthropic(&self.client, &api_url, &model, messages, api_key.as_deref(), named).await?
            }
            "ollama" => call_ollama(&self.client, &api_url, &model, messages, named).await?,
            "google" => call_google(&self.client, &api_url, &messages, api_key.as_deref(), named).await?,
            other => return Err(AdapterError::Other(format!("unsupported platform '{other}' for model '{model}'"))),
        };
        Ok(Value::String(text))
    }
}

/// `llm_simple_call(user_input, model="gpt-3.5-turbo", api_key?) -> String`.
///
/// For API-key platforms with no key (or an obvious placeholder), returns a
/// canned response instead of failing — useful for demos and tests run
/// without credentials.
#[derive(Default)]
pub struct LlmSimpleCall {
    inner: LlmApiCall,
}

#[async_trait]
impl Adapter for LlmSimpleCall {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec!["user_input".into(), "model".into(), "api_key".into()])
    }

    async fn call(
        &self,
        ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let user_input = positional
            .first()
            .and_then(Value::as_str)
            .or_else(|| named.get("user_input").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        let model = named_str(named, "model").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let api_key = named_str(named, "api_key");
        let config = ctx
            .provider
            .get_model(&model)
            .ok_or_else(|| AdapterError::Other(format!("no configuration for model '{model}'")))?;

        let needs_key = matches!(
            config.provider.as_str(),
            "openai" | "anthropic" | "google" | "openai_compatible"
        );
        let placeholder_key = api_key
            .as_deref()
            .map(|k| matches!(k, "your-api-key" | "demo-key" | ""))
            .unwrap_or(true);

        if needs_key && placeholder_key {
            return Ok(Value::String(format!(
                "AI reply: understood your input '{user_input}' (simulated response, real API key required)."
            )));
        }

        let mut call_named = HashMap::new();
        call_named.insert("model".to_string(), Value::String(model));
        if let Some(key) = api_key {
            call_named.insert("api_key".to_string(), Value::String(key));
        }
        call_named.insert("max_tokens".to_string(), json!(500));
        call_named.insert("temperature".to_string(), json!(0.7));
        self.inner
            .call(ctx, &[Value::String(user_input)], &call_named)
            .await
    }
}

/// `llm_chat_call(messages, api_key, model="gpt-3.5-turbo", system_prompt?) -> String`.
#[derive(Default)]
pub struct LlmChatCall {
    inner: LlmApiCall,
}

#[async_trait]
impl Adapter for LlmChatCall {
    fn params(&self) -> ParamSpec {
        ParamSpec::Named(vec![
            "messages".into(),
            "api_key".into(),
            "model".into(),
            "system_prompt".into(),
        ])
    }

    async fn call(
        &self,
        ctx: &AdapterContext<'_>,
        positional: &[Value],
        named: &HashMap<String, Value>,
    ) -> AdapterResult<Value> {
        let mut messages = positional
            .first()
            .cloned()
            .or_else(|| named.get("messages").cloned())
            .and_then(|v| v.as_array().cloned())
            .ok_or_else(|| AdapterError::MissingParam("messages".to_string()))?;

        if let Some(system_prompt) = named.get("system_prompt").and_then(Value::as_str) {
            messages.insert(0, json!({"role": "system", "content": system_prompt}));
        }

        let mut call_named = named.clone();
        call_named.insert("messages".to_string(), Value::Array(messages));
        self.inner.call(ctx, &[], &call_named).await
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
    async fn api_call_fails_without_model_config() {
        let adapter = LlmApiCall::default();
        let err = adapter
            .call(&ctx(), &[Value::from("hi")], &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Other(_)));
    }

    #[tokio::test]
    async fn chat_call_requires_messages() {
        let adapter = LlmChatCall::default();
        let err = adapter.call(&ctx(), &[], &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, AdapterError::MissingParam(_)));
    }
}

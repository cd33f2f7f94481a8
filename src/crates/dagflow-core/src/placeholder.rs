//! Placeholder resolver (C2) — substitutes `${node.field}` inside strings,
//! sequences, and mappings against a context of prior results and runtime
//! inputs.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `${name.field}` where `name` and `field` are `\w+`.
fn placeholder_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\$\{(\w+)\.(\w+)\}").unwrap())
}

/// Resolve every `${name.field}` occurrence in `value` against `context`.
///
/// Recurses into mappings and sequences; scalars other than strings pass
/// through unchanged. Idempotent: resolving an already-resolved value is a
/// no-op, since a fully resolved string contains no more `${...}` patterns.
pub fn resolve(value: &Value, context: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => resolve_string(s, context),
        Value::Object(map) => {
            let resolved = map
                .iter()
                .map(|(k, v)| (k.clone(), resolve(v, context)))
                .collect();
            Value::Object(resolved)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, context)).collect()),
        other => other.clone(),
    }
}

fn resolve_string(s: &str, context: &HashMap<String, Value>) -> Value {
    let re = placeholder_re();

    // Whole-string placeholder: preserve the resolved value's type rather
    // than stringifying it.
    if let Some(caps) = re.captures(s) {
        if caps.get(0).unwrap().as_str() == s.trim() && s.trim() == s {
            if let Some(resolved) = lookup(&caps[1], &caps[2], context) {
                return resolved;
            }
        }
    }

    if !re.is_match(s) {
        return Value::String(s.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut last_end = 0;
    for caps in re.captures_iter(s) {
        let whole = caps.get(0).unwrap();
        out.push_str(&s[last_end..whole.start()]);
        match lookup(&caps[1], &caps[2], context) {
            Some(resolved) => out.push_str(&stringify(&resolved)),
            None => {
                tracing::warn!(
                    node = %&caps[1],
                    field = %&caps[2],
                    "unresolved placeholder, left intact"
                );
                out.push_str(whole.as_str());
            }
        }
        last_end = whole.end();
    }
    out.push_str(&s[last_end..]);
    Value::String(out)
}

/// Look up `${name.field}`: mapping key first, then the bound value itself
/// as a fallback (matching the source's "field access, else the value
/// itself" rule — most useful when `name` is bound to a scalar runtime
/// input and `field` is something like `output`).
fn lookup(name: &str, field: &str, context: &HashMap<String, Value>) -> Option<Value> {
    let bound = context.get(name)?;
    match bound {
        Value::Object(map) => Some(map.get(field).cloned().unwrap_or_else(|| bound.clone())),
        _ => Some(bound.clone()),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn substitutes_in_surrounding_text() {
        let c = ctx(&[("who", json!({"output": "world"}))]);
        let out = resolve(&json!("Hello ${who.output}"), &c);
        assert_eq!(out, json!("Hello world"));
    }

    #[test]
    fn whole_string_placeholder_preserves_type() {
        let c = ctx(&[("src", json!({"output": {"a": 1}}))]);
        let out = resolve(&json!("${src.output}"), &c);
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn recurses_into_mappings_and_sequences() {
        let c = ctx(&[("a", json!({"output": "X"}))]);
        let input = json!({"items": ["${a.output}", {"nested": "${a.output}-suffix"}]});
        let out = resolve(&input, &c);
        assert_eq!(out, json!({"items": ["X", {"nested": "X-suffix"}]}));
    }

    #[test]
    fn missing_key_leaves_placeholder_intact() {
        let c = ctx(&[]);
        let out = resolve(&json!("Hello ${missing.output}"), &c);
        assert_eq!(out, json!("Hello ${missing.output}"));
    }

    #[test]
    fn idempotent() {
        let c = ctx(&[("who", json!({"output": "world"}))]);
        let once = resolve(&json!("Hello ${who.output}!"), &c);
        let twice = resolve(&once, &c);
        assert_eq!(once, twice);
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let c = ctx(&[]);
        assert_eq!(resolve(&json!(42), &c), json!(42));
        assert_eq!(resolve(&json!(true), &c), json!(true));
        assert_eq!(resolve(&Value::Null, &c), Value::Null);
    }
}

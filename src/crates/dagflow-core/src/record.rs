//! Execution record (C1) — the per-node outcome captured at completion.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Status of a completed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The outcome of running one executor node.
///
/// Invariant: `status == Success` iff `error` is `None` iff `output` is
/// `Some`. The two factory functions ([`ExecutionRecord::ok`] and
/// [`ExecutionRecord::fail`]) are the only way to construct one, so the
/// invariant holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The DSL-declared static parameters for this node, preserved verbatim.
    pub custom_vars: HashMap<String, Value>,
    /// The parameters actually passed to the adapter, after merging and
    /// placeholder resolution.
    pub resolved_params: HashMap<String, Value>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    /// `end_time - start_time`, in seconds.
    pub exec_time: f64,
}

impl ExecutionRecord {
    /// Build a successful record.
    pub fn ok(
        name: impl Into<String>,
        output: Value,
        custom_vars: HashMap<String, Value>,
        resolved_params: HashMap<String, Value>,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            status: Status::Success,
            output: Some(output),
            error: None,
            custom_vars,
            resolved_params,
            start_time,
            end_time,
            exec_time: (end_time - start_time).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0,
        }
    }

    /// Build a failed record.
    pub fn fail(
        name: impl Into<String>,
        error: impl Into<String>,
        custom_vars: HashMap<String, Value>,
        resolved_params: HashMap<String, Value>,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            status: Status::Error,
            output: None,
            error: Some(error.into()),
            custom_vars,
            resolved_params,
            start_time,
            end_time,
            exec_time: (end_time - start_time).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Projection used when a downstream node reads `${this.output}`: a
    /// failed dependency's output is the absent value, represented as
    /// JSON `null` rather than propagating the failure.
    pub fn output_or_null(&self) -> Value {
        self.output.clone().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(offset_ms: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now() + chrono::Duration::milliseconds(offset_ms)
    }

    #[test]
    fn ok_record_has_no_error() {
        let rec = ExecutionRecord::ok(
            "a",
            serde_json::json!(42),
            HashMap::new(),
            HashMap::new(),
            t(0),
            t(10),
        );
        assert!(rec.is_success());
        assert!(rec.error.is_none());
        assert_eq!(rec.output, Some(serde_json::json!(42)));
    }

    #[test]
    fn fail_record_has_no_output() {
        let rec = ExecutionRecord::fail("a", "boom", HashMap::new(), HashMap::new(), t(0), t(5));
        assert!(!rec.is_success());
        assert!(rec.output.is_none());
        assert_eq!(rec.output_or_null(), Value::Null);
        assert_eq!(rec.error.as_deref(), Some("boom"));
    }

    #[test]
    fn exec_time_is_nonnegative() {
        let rec = ExecutionRecord::ok("a", Value::Null, HashMap::new(), HashMap::new(), t(0), t(250));
        assert!((rec.exec_time - 0.25).abs() < 0.01);
    }
}

//! Integration tests for the `dagflow` binary: exercise it as a real
//! subprocess against temp-file DSL documents, exactly as an operator
//! would invoke it.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn dagflow_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dagflow"))
}

fn write_doc(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write test fixture");
    path
}

#[test]
fn functions_lists_every_built_in() {
    let output = dagflow_cmd().arg("functions").output().expect("run dagflow functions");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for expected in ["calculate", "text_process", "data_merge", "llm_simple_call"] {
        assert!(stdout.contains(expected), "missing {expected} in:\n{stdout}");
    }
}

#[test]
fn run_succeeds_on_a_linear_text_chain() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        &dir,
        "chain.json",
        r#"{
            "executors": [
                {"name": "a", "func": "text_process", "custom_vars": {"text": "Hello", "operation": "upper"}},
                {"name": "b", "func": "text_process", "depends_on": ["a"], "custom_vars": {"text": "${a.output}", "operation": "lower"}}
            ]
        }"#,
    );
    let output = dagflow_cmd()
        .arg("run")
        .arg(&doc)
        .arg("--dsl-type")
        .arg("json")
        .output()
        .expect("run dagflow run");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["success"], serde_json::json!(true));
    assert_eq!(envelope["results"]["b"]["output"], serde_json::json!("hello"));
}

#[test]
fn run_exits_nonzero_on_compile_failure() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        &dir,
        "bad.json",
        r#"{"executors": [{"name": "a", "func": "does_not_exist"}]}"#,
    );
    let output = dagflow_cmd()
        .arg("run")
        .arg(&doc)
        .arg("--dsl-type")
        .arg("json")
        .output()
        .expect("run dagflow run");
    assert!(!output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("stdout not JSON: {e}\nstdout: {}\nstderr: {}", String::from_utf8_lossy(&output.stdout), String::from_utf8_lossy(&output.stderr)));
    assert_eq!(envelope["success"], serde_json::json!(false));
    assert!(envelope["error"].as_str().unwrap().contains("does_not_exist"));
}

#[test]
fn run_accepts_runtime_input_overriding_dsl_inputs() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        &dir,
        "inputs.json",
        r#"{
            "inputs": {"who": "dsl-default"},
            "executors": [{"name": "a", "func": "text_process", "custom_vars": {"text": "${who.anything}", "operation": "upper"}}]
        }"#,
    );
    let output = dagflow_cmd()
        .arg("run")
        .arg(&doc)
        .arg("--input")
        .arg(r#"{"who": "runtime"}"#)
        .output()
        .expect("run dagflow run");
    assert!(output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["results"]["a"]["output"], serde_json::json!("RUNTIME"));
}

#[test]
fn simple_smoke_test_returns_a_one_node_envelope() {
    let output = dagflow_cmd()
        .arg("simple")
        .arg("hello there")
        .output()
        .expect("run dagflow simple");
    assert!(output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["results"].as_object().unwrap().len(), 1);
    assert!(envelope["results"]["simple"]["output"]
        .as_str()
        .unwrap()
        .contains("hello there"));
}

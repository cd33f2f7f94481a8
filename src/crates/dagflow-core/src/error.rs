//! Error types for DAG compilation and execution.
//!
//! Compile-time problems (an unknown function, a dangling dependency, a
//! cycle) are fatal and surfaced through [`GraphError`]. Runtime node
//! failures are *not* represented here — they are captured into an
//! [`crate::record::ExecutionRecord`] and the graph keeps running (see
//! `record::ExecutionRecord::fail`).

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that abort compilation before any node runs.
///
/// Every variant here is a `CompileError` in the sense of the engine's
/// error taxonomy: the graph never executes a single node once one of
/// these is produced.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The DSL document failed structural validation (duplicate name,
    /// dangling `depends_on` reference, missing required field, ...).
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A node's `func` does not resolve to a registered adapter.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// The dependency graph contains a cycle; compilation performs a full
    /// topological pass and at least one node never reached zero
    /// remaining dependencies.
    #[error("cyclic dependency detected among nodes: {0:?}")]
    CyclicGraph(Vec<String>),

    /// The DSL document could not be parsed as either JSON or YAML.
    #[error("failed to parse document as JSON or YAML: {0}")]
    Parse(String),

    /// I/O failure reading a DSL document from disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

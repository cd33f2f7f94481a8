//! Core DAG execution engine.
//!
//! A workflow is a set of named nodes, each invoking a registered function
//! (an [`registry::Adapter`]) and declaring which other nodes' outputs it
//! depends on. Nodes with no unmet dependency run concurrently; a node
//! reads an upstream result through a `${node.field}` placeholder in its
//! declared arguments.
//!
//! # Layout
//!
//! - [`record`] — the per-node outcome ([`record::ExecutionRecord`])
//! - [`placeholder`] — `${node.field}` substitution
//! - [`registry`] — function name to [`registry::Adapter`] lookup
//! - [`provider`] — the model-provider seam adapters call through
//! - [`node`] — runs one node: resolve, call, capture
//! - [`scheduler`] — runs every node exactly once, respecting dependencies
//! - [`dsl`] — parses and validates a JSON/YAML workflow document
//! - [`engine`] — the facade tying the above together
//! - [`error`] — compile-time error taxonomy
//!
//! # Example
//!
//! ```
//! use dagflow_core::{Engine, DslType};
//! use std::collections::HashMap;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = Engine::new();
//! // registering no functions, so this is a compile-time `UnknownFunction`
//! // failure — every `func` must resolve through the registry before any
//! // node runs.
//! let envelope = engine
//!     .execute(r#"{"executors":[{"name":"a","func":"noop"}]}"#, HashMap::new(), DslType::Json)
//!     .await;
//! assert!(!envelope.success);
//! assert!(envelope.results.is_empty());
//! # }
//! ```

pub mod dsl;
pub mod engine;
pub mod error;
pub mod node;
pub mod placeholder;
pub mod provider;
pub mod record;
pub mod registry;
pub mod scheduler;

pub use dsl::DslType;
pub use engine::{Engine, Envelope};
pub use error::{GraphError, Result};
pub use node::NodeSpec;
pub use provider::{ModelConfig, ModelProvider, NullModelProvider};
pub use record::{ExecutionRecord, Status};
pub use registry::{Adapter, AdapterContext, AdapterError, AdapterResult, FunctionRegistry, ParamSpec};

//! # dagflow
//!
//! Command-line wrapper around `dagflow-core`: loads a DSL document, runs
//! it through the engine with the built-in adapters installed, prints the
//! resulting envelope, and maps `success` to a process exit code (spec.md
//! §6 — exit codes are a CLI concern, not part of the core).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dagflow_core::{DslType, Engine};
use dagflow_tooling::config::get_env_or;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dagflow")]
#[command(about = "Run DAG workflow documents through the dagflow execution engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (can be repeated: -v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DslArg {
    Yaml,
    Json,
    Auto,
}

impl From<DslArg> for DslType {
    fn from(value: DslArg) -> Self {
        match value {
            DslArg::Yaml => DslType::Yaml,
            DslArg::Json => DslType::Json,
            DslArg::Auto => DslType::Auto,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a DSL document (YAML or JSON) through the engine.
    Run {
        /// Path to the workflow document.
        file: PathBuf,

        /// Runtime input, as a JSON object merged over the document's own `inputs`.
        #[arg(short, long)]
        input: Option<String>,

        /// Which surface syntax to parse the document as.
        #[arg(long, value_enum, default_value = "auto")]
        dsl_type: DslArg,
    },

    /// List the names of every function the registry resolves.
    Functions,

    /// Run the one-node `llm_simple_call` smoke test against `user_input`.
    Simple {
        /// The text to send as `user_input`.
        user_input: String,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("dagflow={level}")));
    // stdout carries the envelope JSON; logs go to stderr so piping `dagflow run`
    // into a JSON parser never sees a log line.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_engine() -> Engine {
    let mut engine = Engine::new();
    let provider = dagflow_adapters::ModelConfigProvider::new();
    dagflow_adapters::install_builtins(&mut engine, std::sync::Arc::new(provider));
    engine
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let engine = build_engine();

    match cli.command {
        Commands::Run { file, input, dsl_type } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let inputs: HashMap<String, serde_json::Value> = match input {
                Some(raw) => serde_json::from_str(&raw).context("parsing --input as a JSON object")?,
                None => HashMap::new(),
            };
            let envelope = engine.execute(&text, inputs, dsl_type.into()).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(if envelope.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Functions => {
            for name in engine.list_functions() {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Simple { user_input } => {
            let api_key = get_env_or("OPENAI_API_KEY", "").ok().filter(|k| !k.is_empty());
            let envelope = engine.execute_simple(user_input, api_key).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(if envelope.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::try_parse_from(["dagflow", "run", "workflow.yaml", "--input", "{}"]).unwrap();
        match cli.command {
            Commands::Run { file, input, .. } => {
                assert_eq!(file, PathBuf::from("workflow.yaml"));
                assert_eq!(input.as_deref(), Some("{}"));
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}

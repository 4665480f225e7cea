use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weft::capabilities::CapabilityRegistry;
use weft::config::Config;
use weft::engine::Executor;
use weft::nodes::NodeRegistry;
use weft::workflow::{lint_workflow, parse_workflow_file, validate_workflow, Graph, SortOutcome};

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "DAG workflow execution engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.config/weft/config.toml)
    #[arg(long, global = true, env = "WEFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow and print the result as JSON
    Run {
        /// Path to workflow YAML file
        file: PathBuf,
        /// Seed inputs as a JSON object
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,
        /// Read seed inputs from a JSON file
        #[arg(long)]
        input_file: Option<PathBuf>,
        /// Capability registry (YAML or JSON)
        #[arg(short, long)]
        capabilities: Option<PathBuf>,
        /// Execution timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Validate a workflow file
    Validate {
        /// Path to workflow YAML file
        file: PathBuf,
    },
    /// Print the execution order of a workflow
    Order {
        /// Path to workflow YAML file
        file: PathBuf,
    },
    /// List built-in node types
    Nodes,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "weft=info".into()),
    );
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Run {
            file,
            input,
            input_file,
            capabilities,
            timeout,
        } => {
            let success = cmd_run(
                &config,
                &file,
                input.as_deref(),
                input_file.as_deref(),
                capabilities.as_deref(),
                timeout,
            )
            .await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Validate { file } => cmd_validate(&file)?,
        Commands::Order { file } => cmd_order(&file)?,
        Commands::Nodes => cmd_nodes(),
        Commands::Completions { shell } => cmd_completions(shell)?,
    }

    Ok(())
}

/// Shell completion variants
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CompletionShell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completions
fn cmd_completions(shell: CompletionShell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

// ============================================================================
// Workflow Commands
// ============================================================================

/// Returns whether the execution succeeded.
async fn cmd_run(
    config: &Config,
    file: &Path,
    input: Option<&str>,
    input_file: Option<&Path>,
    capabilities: Option<&Path>,
    timeout: Option<u64>,
) -> anyhow::Result<bool> {
    let workflow = parse_workflow_file(file)
        .with_context(|| format!("Failed to load workflow {}", file.display()))?;

    let inputs = read_inputs(input, input_file)?;

    let registry_path = capabilities
        .map(Path::to_path_buf)
        .or_else(|| config.capabilities.registry_path.clone());
    let capability_registry = match registry_path {
        Some(path) => CapabilityRegistry::from_file(&path)
            .with_context(|| format!("Failed to load capabilities from {}", path.display()))?,
        None => CapabilityRegistry::new(),
    };

    let mut executor = Executor::from_config(config, capability_registry);
    if let Some(secs) = timeout {
        executor = executor.with_timeout(Duration::from_secs(secs));
    }

    let result = executor.execute(&workflow, inputs).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(result.success)
}

fn read_inputs(input: Option<&str>, input_file: Option<&Path>) -> anyhow::Result<Map<String, Value>> {
    let raw = match (input, input_file) {
        (Some(json), _) => json.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => return Ok(Map::new()),
    };

    match serde_json::from_str::<Value>(&raw).context("Inputs must be valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Inputs must be a JSON object, got: {}", other),
    }
}

fn cmd_validate(file: &Path) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let workflow = parse_workflow_file(file)?;
    validate_workflow(&workflow)?;

    println!("✓ Workflow '{}' is valid", workflow.display_name());
    println!();
    println!("  Nodes: {}", workflow.nodes.len());
    println!("  Edges: {}", workflow.edges.len());

    let capability_nodes: Vec<_> = workflow
        .nodes
        .iter()
        .filter(|n| !n.kind().is_builtin())
        .collect();
    if !capability_nodes.is_empty() {
        println!(
            "  Capability nodes: {} (requires a capability registry)",
            capability_nodes.len()
        );
    }

    let warnings = lint_workflow(&workflow);
    if !warnings.is_empty() {
        println!();
        for warning in warnings {
            println!("  ⚠ {}", warning);
        }
    }

    Ok(())
}

fn cmd_order(file: &Path) -> anyhow::Result<()> {
    let workflow = parse_workflow_file(file)?;
    let graph = Graph::new(&workflow.nodes, &workflow.edges);

    match graph.topological_sort() {
        SortOutcome::Sorted(order) => {
            for id in order {
                println!("{}", id);
            }
            Ok(())
        }
        SortOutcome::Cycle { ordered, blocked } => {
            for id in ordered {
                println!("{}", id);
            }
            anyhow::bail!("Circular dependency involving: {}", blocked.join(", "))
        }
    }
}

fn cmd_nodes() {
    let registry = NodeRegistry::new();

    println!("{:<12} DESCRIPTION", "TYPE");
    println!("{}", "-".repeat(60));
    for (node_type, description) in registry.descriptions() {
        println!("{:<12} {}", node_type, description);
    }
    println!();
    println!("Any other type is dispatched to a capability of the same name.");
}

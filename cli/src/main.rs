//! CLI entrypoint for gramcall
//!
//! Wires the layers together: config loading, the llama.cpp backend
//! adapter, a demonstration tool registry, and the agent orchestrator.
//! The `validate-grammar` subcommand runs the batch corpus validator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use gramcall_application::{Agent, AgentConfig};
use gramcall_domain::tool::{ParamType, ToolArgs, ToolDescriptor, ToolError, ToolRegistry};
use gramcall_infrastructure::{
    run_validation, ConfigLoader, FileTraceSink, LlamaCppBackend, ValidationOptions,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gramcall", about = "Grammar-constrained tool-calling agent")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo agent (patient-recording toolset) on a message
    Run {
        /// The user message to process
        message: String,

        /// Explicit config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a prompt/grammar/generation trace to this file
        #[arg(long)]
        trace_file: Option<PathBuf>,
    },

    /// Validate a source corpus against a GBNF grammar
    ValidateGrammar {
        /// Grammar file to validate against
        #[arg(long)]
        grammar: PathBuf,

        /// Base directory of the corpus
        #[arg(long, default_value = ".")]
        base: PathBuf,

        /// Root rule name
        #[arg(long, default_value = "root")]
        root: String,

        /// Explicit validator binary (default: first known name on PATH)
        #[arg(long)]
        validator: Option<String>,

        /// Corpus file extension
        #[arg(long, default_value = "py")]
        extension: String,

        /// Limit files checked (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Disable cycle sanitization
        #[arg(long)]
        no_sanitize_cycles: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            message,
            config,
            trace_file,
        } => run_agent(message, config, trace_file).await,
        Commands::ValidateGrammar {
            grammar,
            base,
            root,
            validator,
            extension,
            limit,
            no_sanitize_cycles,
        } => {
            let mut options = ValidationOptions::new(grammar, base);
            options.root_rule = root;
            options.validator = validator;
            options.extension = extension;
            options.limit = limit;
            options.sanitize = !no_sanitize_cycles;
            validate_grammar(&options)
        }
    }
}

async fn run_agent(
    message: String,
    config_path: Option<PathBuf>,
    trace_file: Option<PathBuf>,
) -> Result<()> {
    let config = ConfigLoader::load(config_path.as_ref())
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    info!(backend = %config.backend.url, "Starting gramcall");

    let backend = Arc::new(LlamaCppBackend::with_timeout(
        config.backend.url.as_str(),
        std::time::Duration::from_secs(config.backend.timeout_secs),
    )?);

    let agent_config = AgentConfig::new(
        "You are a medical intake agent. Record every patient mentioned in the text \
         by calling the record_patient tool once per patient.",
    )
    .with_max_iterations(config.agent.max_iterations)
    .with_temperature(config.agent.temperature)
    .with_allow_no_tool(config.agent.allow_no_tool)
    .with_reasoning_tokens(config.agent.reasoning_tokens)
    .with_completion_marker(config.agent.completion_marker);

    let mut agent = Agent::new(agent_config, backend);
    if let Some(path) = trace_file.or(config.trace.file) {
        agent = agent.with_trace_sink(Arc::new(FileTraceSink::create(&path)?));
    }

    let registry = demo_registry();
    let report = agent.run(&registry, &message).await?;

    println!("{}", report.answer);
    for invocation in report.trace.invocations() {
        let args = invocation
            .parameters
            .iter()
            .map(|p| format!("{}={}", p.name, p.coerced))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}({}) -> {}", invocation.tool, args, invocation.result);
    }
    Ok(())
}

/// Demonstration toolset: record patients mentioned in free text.
fn demo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDescriptor::builder("record_patient", |args: &ToolArgs| {
            let name = args.require_str("name")?;
            let age = args
                .get_i64("age")
                .ok_or_else(|| ToolError::invalid_argument("age must be an integer"))?;
            info!(name = %name, age, "Recording patient");
            Ok(format!("Recorded {}", name))
        })
        .description("Record one patient (name and age) mentioned in the text")
        .parameter("name", ParamType::Text)
        .parameter("age", ParamType::Integer)
        .build(),
    );
    registry
}

fn validate_grammar(options: &ValidationOptions) -> Result<()> {
    let outcome = run_validation(options)?;

    if !outcome.sanitized_rules.is_empty() {
        println!(
            "Sanitized {} cyclic rules for GBNF compatibility.",
            outcome.sanitized_rules.len()
        );
    }
    if outcome.total == 0 {
        println!("No corpus files found.");
        return Ok(());
    }

    println!(
        "Approved: {}/{} ({:.2}%)",
        outcome.approved,
        outcome.total,
        outcome.percent()
    );
    if !outcome.failures.is_empty() {
        println!("\nSample failures:");
        for (path, first_line) in &outcome.failures {
            println!("- {}", path.display());
            if !first_line.is_empty() {
                println!("  {}", first_line);
            }
        }
    }

    if !outcome.all_approved() {
        bail!("{} files rejected", outcome.total - outcome.approved);
    }
    Ok(())
}

//! Parallel agent processors - command line entry point
//!
//! Runs one processor component over a table read from a file or stdin,
//! lists the component catalog, or validates configuration.

use clap::{Parser, Subcommand, ValueEnum};
use parallel_agents::agent::{AgentFactory, AgentSettings, LlmAgentFactory};
use parallel_agents::config::ProcessorConfig;
use parallel_agents::llm::providers::create_provider;
use parallel_agents::mcp::{register_mcp_tools, McpClient, McpError};
use parallel_agents::observability::init_default_logging;
use parallel_agents::processors::{component_catalog, create_processor, Processor};
use parallel_agents::testing::mocks::StubAgentFactory;
use parallel_agents::tools::ToolSystem;
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fan table rows out to LLM agents in parallel
#[derive(Parser)]
#[command(name = "parallel-agents")]
#[command(about = "Processor components that answer table rows with LLM agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PARALLEL_AGENTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one processor over a table
    Run {
        /// Component name or processor type (e.g. "query", "ParallelAgentProcessor")
        #[arg(short, long)]
        processor: String,
        /// JSON table file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Which output to print
        #[arg(short, long, value_enum, default_value_t = OutputChoice::Processed)]
        output: OutputChoice,
        /// Component input as name=value; may be repeated
        #[arg(long = "set", value_name = "NAME=VALUE")]
        inputs: Vec<String>,
    },
    /// Print the component catalog as JSON
    Components,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Run every processor over a sample table with an offline agent
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputChoice {
    Processed,
    Detailed,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let result = match cli.command {
        Commands::Run {
            processor,
            input,
            output,
            inputs,
        } => match load_configuration(&cli.config) {
            Ok(config) => run_processor(config, &processor, &input, output, &inputs).await,
            Err(e) => Err(e),
        },
        Commands::Components => print_catalog(),
        Commands::Config { show } => match load_configuration(&cli.config) {
            Ok(config) => handle_config_command(config, show),
            Err(e) => Err(e),
        },
        Commands::Demo => run_demo().await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<ProcessorConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(ProcessorConfig::load_from_file(path)?);
    }

    for path_str in ["parallel-agents.toml", "config/parallel-agents.toml"] {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(ProcessorConfig::load_from_file(path)?);
        }
    }

    Err("No configuration file found. Provide one with -c/--config or create parallel-agents.toml".into())
}

/// Builtin tools from `[tools]` plus whatever the MCP server offers
async fn build_tools(config: &ProcessorConfig) -> Result<ToolSystem, Box<dyn std::error::Error>> {
    let mut tools = ToolSystem::from_config(&config.tools).await?;

    if let Some(section) = &config.mcp {
        match McpClient::from_section(section, config.get_mcp_auth_token()) {
            Ok(client) => {
                let client = Arc::new(client);
                client.initialize().await?;
                register_mcp_tools(client, &mut tools).await?;
            }
            Err(McpError::Disabled) => info!("MCP server disabled in configuration"),
            Err(e) => return Err(e.into()),
        }
    }

    info!(tools = ?tools.list_tools(), "Tool system ready");
    Ok(tools)
}

async fn build_factory(
    config: &ProcessorConfig,
) -> Result<Arc<dyn AgentFactory>, Box<dyn std::error::Error>> {
    let provider = create_provider(&config.llm, config.get_llm_api_key()?)?;
    if let Err(e) = provider.health_check().await {
        warn!(provider = provider.name(), error = %e, "LLM provider health check failed");
    }

    let tools = build_tools(config).await?;
    Ok(Arc::new(LlmAgentFactory::new(
        provider,
        Arc::new(tools),
        AgentSettings::from_config(config),
    )))
}

/// Configuration defaults for inputs the component declares
fn apply_config_defaults(
    processor: &mut dyn Processor,
    config: &ProcessorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let descriptor = processor.descriptor();
    let mut defaults = vec![("agent_count", config.processor.agent_count.to_string())];
    if let Some(max_workers) = config.processor.max_workers {
        defaults.push(("max_workers", max_workers.to_string()));
    }
    if let Some(template) = &config.processor.prompt_template {
        defaults.push(("agent_prompt_template", template.clone()));
    }

    for (name, value) in defaults {
        if descriptor.input(name).is_some() {
            processor.set_input(name, &value)?;
        }
    }
    Ok(())
}

fn read_table(input: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&raw)?)
}

async fn run_processor(
    config: ProcessorConfig,
    name: &str,
    input: &str,
    output: OutputChoice,
    inputs: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let table = read_table(input)?;
    let factory = build_factory(&config).await?;

    let mut processor = create_processor(name, factory)?;
    apply_config_defaults(processor.as_mut(), &config)?;
    for assignment in inputs {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("Expected NAME=VALUE, got '{assignment}'"))?;
        processor.set_input(key.trim(), value)?;
    }

    info!(processor = %processor.kind(), "Running processor");
    match output {
        OutputChoice::Processed => println!("{}", processor.build_processed_results(&table).await),
        OutputChoice::Detailed => {
            let detailed = processor.build_detailed_results(&table).await;
            println!("{}", serde_json::to_string_pretty(&detailed)?);
        }
    }
    Ok(())
}

fn print_catalog() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&component_catalog())?);
    Ok(())
}

fn handle_config_command(
    config: ProcessorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}

async fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let table = json!({
        "data": [
            {"text": "What is the capital of France?"},
            {"text": "Summarize the plot of Hamlet in one line."},
            {"text": "Name three prime numbers."}
        ]
    });
    let factory: Arc<dyn AgentFactory> = Arc::new(StubAgentFactory::echo());

    for descriptor in component_catalog() {
        let processor = create_processor(descriptor.name, Arc::clone(&factory))?;
        let detailed = processor.build_detailed_results(&table).await;

        println!("== {} ({})", descriptor.display_name, descriptor.processor_type);
        println!("{}", processor.build_processed_results(&table).await);
        println!("{}", serde_json::to_string_pretty(&detailed)?);
    }
    Ok(())
}

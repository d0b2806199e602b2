//! Sleuth CLI: run one research query from the terminal.

use anyhow::bail;
use clap::Parser;
use sleuth_core::config::{
    SleuthConfig, load_config, load_config_file, require_api_key, resolve_api_key,
};
use sleuth_core::research::workflow_mermaid;
use sleuth_core::{
    AnthropicProvider, LlmProvider, ResearchAgent, SearchPreference, SearchProvider, TavilySearch,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Sleuth: iterative, source-validating research
#[derive(Parser, Debug)]
#[command(name = "sleuth", version, about, long_about = None)]
struct Cli {
    /// Research question
    #[arg(required_unless_present = "graph")]
    query: Option<String>,

    /// Iteration budget (defaults to research.max_iterations)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Search mode: auto, live, simulated
    #[arg(long)]
    search: Option<SearchPreference>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print the workflow as a Mermaid diagram and exit
    #[arg(long)]
    graph: bool,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.graph {
        println!("{}", workflow_mermaid());
        return Ok(());
    }

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "sleuth", "sleuth")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sleuth.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = match &cli.config {
        Some(path) => load_config_file(path),
        None => load_config(Some(&workspace), None),
    }
    .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let (llm, search) = build_collaborators(&config)?;
    let agent = ResearchAgent::new(llm, search, &config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing the current stage");
            on_interrupt.cancel();
        }
    });

    let query = cli.query.unwrap_or_default();
    let preference = cli.search.unwrap_or(config.research.default_search);
    let result = agent
        .run_research_with_cancel(&query, cli.max_iterations, preference, &cancel)
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.to_markdown());
    }
    Ok(())
}

/// Build the text-generation client and, when a key is available, the search client.
fn build_collaborators(
    config: &SleuthConfig,
) -> anyhow::Result<(Arc<dyn LlmProvider>, Option<Arc<dyn SearchProvider>>)> {
    if config.llm.provider != "anthropic" {
        bail!("Unsupported LLM provider '{}'", config.llm.provider);
    }
    let llm_key = require_api_key(&config.llm.api_key_env)?;
    let llm: Arc<dyn LlmProvider> = Arc::new(AnthropicProvider::new(&config.llm, llm_key)?);

    let search: Option<Arc<dyn SearchProvider>> = match resolve_api_key(&config.search.api_key_env)
    {
        Some(key) if config.search.provider == "tavily" => {
            Some(Arc::new(TavilySearch::new(&config.search, key)?))
        }
        Some(_) => {
            tracing::warn!(
                provider = %config.search.provider,
                "Unsupported search provider; using simulated search"
            );
            None
        }
        None => {
            tracing::info!(
                "{} not set; using simulated search",
                config.search.api_key_env
            );
            None
        }
    };

    Ok((llm, search))
}

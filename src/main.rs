//! Notemap CLI entry point

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "notemap")]
#[command(about = "Map data lineage across a collection of notebooks", long_about = None)]
struct Cli {
    /// Notebook file or directory to scan
    path: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Oracle provider ("openai" or "fixture")
    #[arg(long)]
    provider: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Environment variable holding the API key
    #[arg(long)]
    api_key_env: Option<String>,

    /// Canned oracle responses for the fixture provider
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Notebooks analysed concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-call oracle timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the graph to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // stdout carries the graph, logs go to stderr
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("notemap={}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Notemap v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::Config::load(cli.config.as_deref())?;
    config.apply(config::Overrides {
        provider: cli.provider,
        endpoint: cli.endpoint,
        model: cli.model,
        api_key_env: cli.api_key_env,
        fixture: cli.fixture,
        workers: cli.workers,
        timeout_secs: cli.timeout_secs,
    })?;

    commands::map(&cli.path, &config, cli.output.as_deref()).await
}

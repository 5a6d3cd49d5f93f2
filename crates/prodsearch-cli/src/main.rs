//! ProdSearch CLI - Product search over a Qdrant catalog
//!
//! # Usage
//!
//! ```bash
//! # Search, letting the classifier pick the strategy
//! prodsearch search "RAD64002019"
//!
//! # Force a strategy and filter on a payload field
//! prodsearch search "mig welder" -m rrf --filter brand=Miller
//!
//! # Check whether queries look like part numbers (no services needed)
//! prodsearch classify HYP-220-479 "best gas torch" --explain
//!
//! # Run every strategy side by side
//! prodsearch compare "argon regulator"
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use prodsearch_config::{ConfigOverrides, EmbeddingProviderType, LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod progress;

/// ProdSearch - Exact + vector fusion search for product catalogs
#[derive(Parser, Debug)]
#[command(name = "prodsearch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to a configuration file (replaces ./.prodsearch/config.toml)
    #[arg(long, short = 'c', global = true, env = "PRODSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Qdrant server URL
    #[arg(long, global = true, env = "PRODSEARCH_QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Product collection name
    #[arg(long, global = true, env = "PRODSEARCH_COLLECTION")]
    collection: Option<String>,

    /// Embedding provider type (tei, ollama, openai)
    #[arg(long, global = true, env = "PRODSEARCH_EMBEDDING_PROVIDER", value_parser = parse_embedding_provider)]
    embedding_provider: Option<EmbeddingProviderType>,

    /// Search deadline in seconds
    #[arg(long, global = true)]
    deadline: Option<u64>,
}

/// Parse embedding provider from string
fn parse_embedding_provider(s: &str) -> Result<EmbeddingProviderType, String> {
    s.parse()
        .map_err(|e: prodsearch_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            qdrant_url: self.qdrant_url.clone(),
            collection: self.collection.clone(),
            embedding_provider: self.embedding_provider,
            log_level,
            deadline_secs: self.deadline,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the product catalog
    Search(commands::search::SearchArgs),

    /// Classify queries as part numbers or natural language
    Classify(commands::classify::ClassifyArgs),

    /// Run every search strategy for one query and compare them
    Compare(commands::compare::CompareArgs),

    /// Show collection and embedding provider status
    Status(commands::status::StatusArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the stderr subscriber.
///
/// `-v`/`-q` win over `RUST_LOG`, which wins over `logging.level`.
fn init_logging(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let explicit = global.verbose || global.quiet;
    let filter = if explicit {
        EnvFilter::new(&logging.level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    match logging.format {
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before a config error is reported
    let config = commands::load_config(&cli.global);
    let logging = match config {
        Ok(ref config) => config.logging.clone(),
        Err(_) => LoggingConfig {
            level: if cli.global.verbose { "debug" } else { "error" }.to_string(),
            ..Default::default()
        },
    };
    init_logging(&cli.global, &logging)?;

    // `config` subcommands must work even when the config file is broken
    match cli.command {
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, config?, cli.global).await,
        Commands::Classify(args) => commands::classify::execute(args, config?, cli.global).await,
        Commands::Compare(args) => commands::compare::execute(args, config?, cli.global).await,
        Commands::Status(args) => commands::status::execute(args, config?, cli.global).await,
    }
}

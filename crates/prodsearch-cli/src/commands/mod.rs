//! CLI command implementations

pub mod classify;
pub mod compare;
pub mod config;
pub mod search;
pub mod status;

use anyhow::{Context, Result};
use clap::ValueEnum;
use prodsearch_config::{ConfigLoader, SearchConfig};
use prodsearch_search::SearchService;

use crate::progress;
use crate::GlobalOptions;

/// Output format shared by the commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Load configuration: global, then local (or `--config`), then CLI overrides.
pub fn load_config(global: &GlobalOptions) -> Result<SearchConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    if let Some(ref path) = global.config {
        return loader
            .load_from(path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", path.display()));
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    loader
        .load(&cwd, Some(&overrides))
        .context("Failed to load configuration")
}

/// Validate the configuration and connect to Qdrant and the embedder.
pub async fn connect_service(config: &SearchConfig, global: &GlobalOptions) -> Result<SearchService> {
    config.validate().context("Invalid configuration")?;

    let pb = progress::spinner(
        &format!(
            "Connecting to {} ({})",
            config.qdrant.url, config.qdrant.collection
        ),
        global.quiet,
    );

    match SearchService::connect(config).await {
        Ok(service) => {
            progress::finish_and_clear(pb);
            Ok(service)
        }
        Err(e) => {
            progress::finish_spinner_error(pb, "Connection failed");
            Err(e).with_context(|| format!("Failed to connect to Qdrant at {}", config.qdrant.url))
        }
    }
}

/// Print an info message to stderr (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

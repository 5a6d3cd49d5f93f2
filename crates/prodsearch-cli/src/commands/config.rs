//! Config command - View and manage configuration
//!
//! - Show the effective configuration
//! - Get a single value by dotted key
//! - Show configuration file paths
//! - Write a default configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use prodsearch_config::{ConfigLoader, SearchConfig};
use serde::Serialize;

use super::load_config;
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration (defaults, files and CLI overrides merged)
    Show(ShowArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "search.min_vector_score")
    key: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Write ~/.prodsearch/config.toml instead of ./.prodsearch/config.toml
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Explicit `--config` file, if given
    pub explicit: Option<PathBuf>,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Get(args) => execute_get(args, global),
        ConfigCommand::Path(args) => execute_path(args, global),
        ConfigCommand::Init(args) => execute_init(args),
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to render configuration")?
        );
    }

    Ok(())
}

fn execute_get(args: GetArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    let value = get_config_value(&config, &args.key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match value {
            serde_json::Value::String(s) => println!("{}", s),
            serde_json::Value::Bool(b) => println!("{}", b),
            serde_json::Value::Number(n) => println!("{}", n),
            serde_json::Value::Null => println!("null"),
            other => println!("{}", serde_json::to_string_pretty(&other)?),
        }
    }

    Ok(())
}

fn execute_path(args: PathArgs, global: GlobalOptions) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&cwd);

    let paths = ConfigPaths {
        global: global_path.clone(),
        local: local_path.clone(),
        explicit: global.config.clone(),
        global_exists: global_path.as_ref().map(|p| p.exists()).unwrap_or(false),
        local_exists: local_path.exists(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        if let Some(ref gp) = paths.global {
            println!("Global: {} ({})", gp.display(), exists_label(paths.global_exists));
        } else {
            println!("Global: not available (no home directory)");
        }
        println!("Local:  {} ({})", paths.local.display(), exists_label(paths.local_exists));
        if let Some(ref explicit) = paths.explicit {
            println!(
                "Using:  {} ({})",
                explicit.display(),
                exists_label(explicit.exists())
            );
        }
    }

    Ok(())
}

fn execute_init(args: InitArgs) -> Result<()> {
    let loader = ConfigLoader::new();

    let path = if args.global {
        loader.init_global()?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        loader.init_local(&cwd)?
    };

    println!("Configuration file: {}", path.display());
    Ok(())
}

fn exists_label(exists: bool) -> &'static str {
    if exists {
        "exists"
    } else {
        "not found"
    }
}

/// Get a configuration value by dotted key path
fn get_config_value(config: &SearchConfig, key: &str) -> Option<serde_json::Value> {
    let json = serde_json::to_value(config).ok()?;

    let mut current = &json;
    for part in key.split('.') {
        current = current.get(part)?;
    }

    Some(current.clone())
}

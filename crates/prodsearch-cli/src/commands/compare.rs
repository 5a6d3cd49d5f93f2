//! Compare command - Run every strategy side by side

use anyhow::{Context, Result};
use clap::Args;
use prodsearch_config::SearchConfig;

use super::{connect_service, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the compare command
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Search query
    query: String,

    /// Results per strategy
    #[arg(long, short = 'n', default_value = "5")]
    limit: usize,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Execute the compare command
pub async fn execute(args: CompareArgs, config: SearchConfig, global: GlobalOptions) -> Result<()> {
    let service = connect_service(&config, &global).await?;
    let rows = service
        .compare(&args.query, args.limit)
        .await
        .context("Comparison failed")?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            let verdict = service.classifier().explain(&args.query);
            if !global.quiet {
                println!(
                    "Comparing strategies for \"{}\" (classified as {}):\n",
                    args.query,
                    if verdict.is_part_number {
                        "part number"
                    } else {
                        "natural language"
                    }
                );
            }

            println!(
                "{:<8} {:>7} {:>10}  {}",
                "MODE", "RESULTS", "TIME", "TOP RESULT"
            );
            for row in &rows {
                let top = match (&row.error, &row.top) {
                    (Some(error), _) => format!("error: {}", error),
                    (None, Some(hit)) => format!("{} ({:.3}, {})", hit.id, hit.score, hit.search_type),
                    (None, None) => "-".to_string(),
                };
                println!(
                    "{:<8} {:>7} {:>8.1}ms  {}",
                    row.mode.as_str(),
                    row.count,
                    row.elapsed.as_secs_f64() * 1000.0,
                    top
                );
            }
        }
    }

    Ok(())
}

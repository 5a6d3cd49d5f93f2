//! Classify command - Part number or natural language?
//!
//! Runs the query classifier locally; no Qdrant or embedding server needed.

use anyhow::{Context, Result};
use clap::Args;
use prodsearch_config::SearchConfig;
use prodsearch_search::PartNumberClassifier;

use super::OutputFormat;
use crate::GlobalOptions;

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Queries to classify
    #[arg(required = true)]
    queries: Vec<String>,

    /// Show every rule that fired
    #[arg(long, short = 'e')]
    explain: bool,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Execute the classify command
pub async fn execute(args: ClassifyArgs, config: SearchConfig, _global: GlobalOptions) -> Result<()> {
    let classifier =
        PartNumberClassifier::new(&config.classifier).context("Invalid classifier settings")?;
    let results: Vec<_> = args.queries.iter().map(|q| classifier.explain(q)).collect();

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Text => {
            for result in &results {
                let verdict = if result.is_part_number {
                    "part number"
                } else {
                    "natural language"
                };
                println!(
                    "{:?}: {} (score {}, threshold {})",
                    result.query, verdict, result.score, result.threshold
                );
                if args.explain {
                    for line in result.explanation() {
                        println!("    {}", line);
                    }
                }
            }
        }
    }

    Ok(())
}

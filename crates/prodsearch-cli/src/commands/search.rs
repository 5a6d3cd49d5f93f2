//! Search command - Query the product catalog

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use prodsearch_config::SearchConfig;
use prodsearch_search::{PayloadFilter, SearchMode, SearchRequest};

use super::{connect_service, print_info, OutputFormat};
use crate::GlobalOptions;

/// Search strategy
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Fusion for part numbers, RRF for everything else (default)
    Auto,
    /// Dense vector similarity
    Dense,
    /// BM25 keyword search
    Sparse,
    /// Qdrant-side RRF over dense and sparse
    Hybrid,
    /// Client-side RRF over dense and sparse
    Rrf,
    /// Parallel exact lookup + vector search
    Fusion,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => SearchMode::Auto,
            ModeArg::Dense => SearchMode::Dense,
            ModeArg::Sparse => SearchMode::Sparse,
            ModeArg::Hybrid => SearchMode::Hybrid,
            ModeArg::Rrf => SearchMode::Rrf,
            ModeArg::Fusion => SearchMode::Fusion,
        }
    }
}

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (part number or free text)
    query: String,

    /// Maximum number of results to return [default: search.default_limit]
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Search strategy
    #[arg(long, short = 'm', value_enum, default_value = "auto")]
    mode: ModeArg,

    /// Keep only results whose payload field equals a value (field=value)
    #[arg(long, short = 'f')]
    filter: Option<String>,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,

    /// Print fusion and embedding cache statistics afterwards
    #[arg(long)]
    stats: bool,
}

/// Execute the search command
pub async fn execute(args: SearchArgs, config: SearchConfig, global: GlobalOptions) -> Result<()> {
    // Reject a malformed filter before touching the network
    let filter = args
        .filter
        .as_deref()
        .map(PayloadFilter::parse)
        .transpose()?;

    let mut request = SearchRequest::new(
        args.query.clone(),
        args.limit.unwrap_or(config.search.default_limit),
    )
    .mode(args.mode.into());
    if let Some(filter) = filter {
        request = request.filter(filter);
    }

    let service = connect_service(&config, &global).await?;
    let response = service.search(&request).await.context("Search failed")?;
    let rows = service.summarize(&response.hits);

    match args.output {
        OutputFormat::Json => {
            let mut json = serde_json::json!({
                "query": response.query,
                "mode": response.mode,
                "elapsed_ms": response.elapsed.as_secs_f64() * 1000.0,
                "results": rows,
            });
            if let Some(ref classification) = response.classification {
                json["classification"] = serde_json::to_value(classification)?;
            }
            if args.stats {
                json["stats"] = serde_json::to_value(service.stats())?;
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&json).context("Failed to serialize results")?
            );
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                print_info(&format!("No results found for: {}", args.query), global.quiet);
            } else {
                if !global.quiet {
                    println!(
                        "Found {} results for \"{}\" ({} search, {:.1}ms):\n",
                        rows.len(),
                        response.query,
                        response.mode,
                        response.elapsed.as_secs_f64() * 1000.0
                    );
                }

                for (i, row) in rows.iter().enumerate() {
                    println!(
                        "{}. {}  {}",
                        i + 1,
                        row.id,
                        row.description.as_deref().unwrap_or("")
                    );
                    println!("   Score: {:.3}  Type: {}", row.score, row.search_type);
                    if let Some(ref mfg) = row.manufacturer_part_number {
                        println!("   Mfg part: {}", mfg);
                    }
                    if let Some(ref price) = row.price {
                        println!("   Price: {}", price);
                    }
                    println!();
                }
            }

            if args.stats {
                let stats = service.stats();
                println!(
                    "Fusion searches: {} ({} failed)",
                    stats.fusion.total_searches, stats.fusion.failed_searches
                );
                println!(
                    "Fusion averages: exact {:.1}ms, vector {:.1}ms, fusion {:.2}ms, total {:.1}ms",
                    stats.fusion.avg_exact_ms,
                    stats.fusion.avg_vector_ms,
                    stats.fusion.avg_fusion_ms,
                    stats.fusion.avg_total_ms
                );
                println!(
                    "Embedding cache: {}/{} entries, {} hits, {} misses",
                    stats.embedding_cache.size,
                    stats.embedding_cache.capacity,
                    stats.embedding_cache.metrics.hits,
                    stats.embedding_cache.metrics.misses
                );
            }
        }
    }

    Ok(())
}

//! Status command - Collection and embedding provider health

use anyhow::{Context, Result};
use clap::Args;
use prodsearch_config::SearchConfig;

use super::connect_service;
use crate::progress;
use crate::GlobalOptions;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also run one dense and one fusion search and report their latency
    #[arg(long)]
    warmup: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: SearchConfig, global: GlobalOptions) -> Result<()> {
    let service = connect_service(&config, &global).await?;
    let status = service.status().await.context("Failed to read status")?;

    let warmup = if args.warmup {
        let pb = progress::spinner("Warming up", global.quiet || args.json);
        let report = service.warmup().await.context("Warmup failed")?;
        progress::finish_spinner(pb, "Warmed up");
        Some(report)
    } else {
        None
    };

    if args.json {
        let mut json = serde_json::json!({
            "qdrant_url": config.qdrant.url,
            "collection": status.collection,
            "embedder": status.embedder,
        });
        if let Some(ref report) = warmup {
            json["warmup"] = serde_json::to_value(report)?;
        }
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Qdrant:      {}", config.qdrant.url);
    let collection = &status.collection;
    if collection.exists {
        println!(
            "Collection:  {} ({} points, {} indexed vectors)",
            collection.name,
            collection
                .points_count
                .map_or_else(|| "?".to_string(), |n| n.to_string()),
            collection
                .indexed_vectors_count
                .map_or_else(|| "?".to_string(), |n| n.to_string())
        );
    } else {
        println!("Collection:  {} (missing)", collection.name);
    }

    let embedder = &status.embedder;
    if embedder.available {
        println!(
            "Embeddings:  {} {} at {}{}",
            embedder.provider_type,
            embedder.model,
            embedder.endpoint,
            embedder
                .latency_ms
                .map(|ms| format!(" ({}ms)", ms))
                .unwrap_or_default()
        );
        if let Some(dimension) = embedder.dimension {
            println!("Dimension:   {}", dimension);
        }
    } else {
        println!(
            "Embeddings:  {} unavailable: {}",
            embedder.provider_type,
            embedder.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(report) = warmup {
        println!(
            "Warmup:      dense {:.1}ms, fusion {:.1}ms",
            report.dense.as_secs_f64() * 1000.0,
            report.fusion.as_secs_f64() * 1000.0
        );
    }

    Ok(())
}

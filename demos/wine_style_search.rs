//! # Wine-style grid search
//!
//! Runs the default random-forest search over a synthetic table shaped
//! like the classic wine dataset (13 features, 3 imbalanced classes),
//! with every stage memoized on disk.
//!
//! ```text
//! cargo run --example wine_style_search [config.json]
//! RUST_LOG=hypergrid=debug cargo run --example wine_style_search
//! ```
//!
//! Run it twice: the second run is served entirely from the cache.

use std::sync::Arc;

use hypergrid::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hypergrid=info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let frame = make_blobs(&[59, 71, 48], 13, 1.5, 42)?;
    let cache_dir = std::env::temp_dir().join("hypergrid-demo-cache");
    let pipeline = Pipeline::new(config, RandomForestFactory::default())
        .with_cache(Arc::new(DiskCache::new(&cache_dir)?));

    let output = pipeline.run(&frame)?;

    println!("=== Search results ({}) ===", output.search.metric);
    let table = output.search.table();
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join("\t"));
    }
    for failure in &output.search.training_failures {
        println!("failed: {} ({})", failure.hyperparameters, failure.message);
    }

    println!("\nBest: {} -> {:.4}", output.best.hyperparameters, output.search.best_score);

    for partition in Partition::ALL {
        let report = output.evaluation.get(partition);
        println!("\n=== {partition} ===");
        println!("{report}");
        println!("confusion: {:?}", report.confusion.to_nested());
    }

    let stats = pipeline.cache_stats();
    println!(
        "\ncache {}: {} hits, {} misses ({:.0}% hit rate)",
        cache_dir.display(),
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0
    );
    Ok(())
}

//! CLI command implementations

use crate::config::Config;
use anyhow::Context;
use notemap_indexer::{Coordinator, ScanReport};
use std::path::Path;
use std::sync::Arc;

/// Scan `root`, build the lineage graph and write it as DOT.
pub async fn map(root: &Path, config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    tracing::info!("Mapping notebooks under: {}", root.display());

    let oracle_config = config.oracle_config(config.api_key_from_env());
    let oracle = notemap_ai::providers::create_provider(&oracle_config)?;
    tracing::info!("Using {} oracle ({})", oracle.name(), oracle_config.model);

    let coordinator = Coordinator::new(Arc::from(oracle), config.scan_config());
    let report = coordinator
        .build_graph(root)
        .await
        .with_context(|| format!("Cannot scan {}", root.display()))?;

    let dot = notemap_core::render(&report.graph).context("Failed to render lineage graph")?;
    match output {
        Some(path) => {
            std::fs::write(path, &dot)
                .with_context(|| format!("Failed to write graph to {}", path.display()))?;
            tracing::info!("Graph written to {}", path.display());
        }
        None => print!("{}", dot),
    }

    summarize(&report);
    Ok(())
}

fn summarize(report: &ScanReport) {
    tracing::info!(
        "{} notebooks merged, {} failed, {} nodes, {} edges",
        report.merged.len(),
        report.failures.len(),
        report.graph.node_count(),
        report.graph.edge_count()
    );
    for failure in &report.failures {
        eprintln!("failed: {}: {}", failure.relative_path.display(), failure.error);
    }
}

//! `membench list`

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use membench_core::domain::{BenchmarkConfig, ProviderConfig, ProviderKind};
use membench_packs::PackRegistry;

use crate::config::load_config_dir;
use crate::output::Listing;
use crate::Context;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only list providers
    #[arg(long)]
    providers: bool,

    /// Only list benchmarks
    #[arg(long)]
    benchmarks: bool,

    /// Filter benchmarks by tags (comma-separated, all must match)
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BenchmarkRow {
    name: String,
    version: String,
    tags: Vec<String>,
    pack: Option<String>,
    metrics: usize,
}

impl BenchmarkRow {
    fn from_config(config: &BenchmarkConfig, packs: &PackRegistry) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            tags: config.tags.clone(),
            pack: packs
                .get_latest(&config.name)
                .map(|p| p.pack_id().to_string()),
            metrics: config.metrics.len(),
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.version.clone(),
            self.tags.join(", "),
            self.pack.clone().unwrap_or_else(|| "-".to_string()),
            self.metrics.to_string(),
        ]
    }
}

#[derive(Debug, Serialize)]
struct ProviderRow {
    name: String,
    kind: String,
    capabilities: Vec<String>,
}

impl ProviderRow {
    fn from_config(config: &ProviderConfig) -> Self {
        let kind = match &config.kind {
            ProviderKind::Hosted { url, .. } => format!("hosted ({url})"),
            ProviderKind::Local { adapter } => format!("local ({adapter})"),
            ProviderKind::Container { service, .. } => format!("container ({service})"),
        };
        let flags = [
            (config.capabilities.supports_chunks, "chunks"),
            (config.capabilities.supports_batch, "batch"),
            (config.capabilities.supports_metadata, "metadata"),
            (config.capabilities.supports_rerank, "rerank"),
        ];
        Self {
            name: config.name.clone(),
            kind,
            capabilities: flags
                .into_iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, name)| name.to_string())
                .collect(),
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.kind.clone(),
            self.capabilities.join(", "),
        ]
    }
}

pub async fn execute(ctx: &Context, args: ListArgs) -> Result<()> {
    let packs = PackRegistry::with_defaults();
    let configs = load_config_dir(&ctx.config_dir, &packs)?;
    let show_benchmarks = !args.providers || args.benchmarks;
    let show_providers = !args.benchmarks || args.providers;

    if show_benchmarks {
        let mut listing = Listing::new(&["Benchmark", "Version", "Tags", "Pack", "Metrics"]);
        for config in configs
            .benchmarks
            .iter()
            .filter(|b| args.tags.iter().all(|tag| b.tags.contains(tag)))
        {
            let row = BenchmarkRow::from_config(config, &packs);
            let cells = row.cells();
            listing.row(&row, cells)?;
        }
        ctx.writer.render(listing)?;
    }

    if show_providers {
        let mut listing = Listing::new(&["Provider", "Kind", "Capabilities"]);
        for config in &configs.providers {
            let row = ProviderRow::from_config(config);
            let cells = row.cells();
            listing.row(&row, cells)?;
        }
        ctx.writer.render(listing)?;
    }
    Ok(())
}

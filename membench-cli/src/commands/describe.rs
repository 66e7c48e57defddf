//! `membench describe <name>`

use anyhow::{bail, Result};
use clap::Args;

use membench_packs::PackRegistry;

use crate::config::load_config_dir;
use crate::output::Details;
use crate::Context;

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Name of a registered benchmark or provider
    name: String,
}

pub async fn execute(ctx: &Context, args: DescribeArgs) -> Result<()> {
    let packs = PackRegistry::with_defaults();
    let configs = load_config_dir(&ctx.config_dir, &packs)?;

    if let Some(benchmark) = configs.benchmarks.iter().find(|b| b.name == args.name) {
        let mut details = Details::new(format!("Benchmark {}", benchmark.name))
            .optional("Display name", benchmark.display_name.as_deref())
            .field("Version", &benchmark.version)
            .list("Tags", &benchmark.tags)
            .field("Data path", &benchmark.data.path)
            .field("Top-K", benchmark.search.top_k.to_string())
            .list("Metrics", &benchmark.metrics)
            .list("Question types", &benchmark.question_types);

        if let Some(pack) = packs.get_latest(&benchmark.name) {
            let sealed = pack.sealed();
            let facets: Vec<String> = [
                (sealed.prompts, "prompts"),
                (sealed.scoring, "scoring"),
                (sealed.relevance, "relevance"),
            ]
            .into_iter()
            .filter(|(owned, _)| *owned)
            .map(|(_, facet)| facet.to_string())
            .collect();
            details = details
                .field("Pack", pack.pack_id())
                .list("Sealed facets", &facets);
        }
        details.print();
        return Ok(());
    }

    if let Some(provider) = configs.providers.iter().find(|p| p.name == args.name) {
        Details::new(format!("Provider {}", provider.name))
            .optional("Display name", provider.display_name.as_deref())
            .field("Kind", format!("{:?}", provider.kind))
            .field("Scoping", format!("{:?}", provider.scoping))
            .field(
                "Capabilities",
                format!(
                    "chunks={} batch={} metadata={} rerank={}",
                    provider.capabilities.supports_chunks,
                    provider.capabilities.supports_batch,
                    provider.capabilities.supports_metadata,
                    provider.capabilities.supports_rerank
                ),
            )
            .print();
        return Ok(());
    }

    let known: Vec<String> = configs
        .benchmarks
        .iter()
        .map(|b| b.name.clone())
        .chain(configs.providers.iter().map(|p| p.name.clone()))
        .collect();
    bail!(
        "'{}' is not a registered benchmark or provider; known: {}",
        args.name,
        known.join(", ")
    );
}

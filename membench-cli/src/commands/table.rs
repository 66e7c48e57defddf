//! `membench table` — provider comparison for one benchmark.

use anyhow::{bail, Result};
use clap::Args;

use membench_storage::ResultsStore;

use crate::output::print_comparison;
use crate::Context;

#[derive(Debug, Args)]
pub struct TableArgs {
    /// Run id
    #[arg(long)]
    run: String,

    /// Benchmark to compare across providers
    #[arg(long)]
    benchmark: String,

    /// Provider whose accuracy anchors the delta column
    #[arg(long)]
    baseline: Option<String>,
}

pub async fn execute(ctx: &Context, args: TableArgs) -> Result<()> {
    let store = ResultsStore::open(&ctx.results_db()).await?;
    let aggregates = store
        .compare_providers(&args.run, &args.benchmark, &[])
        .await?;
    if aggregates.is_empty() {
        bail!(
            "no results for benchmark '{}' in run '{}'",
            args.benchmark,
            args.run
        );
    }
    if let Some(baseline) = &args.baseline {
        if !aggregates.iter().any(|a| &a.provider == baseline) {
            bail!("baseline provider '{baseline}' has no results for this benchmark");
        }
    }

    let rows: Vec<(String, f64, i64)> = aggregates
        .iter()
        .map(|a| {
            let accuracy = if a.total > 0 {
                a.correct as f64 / a.total as f64
            } else {
                0.0
            };
            (a.provider.clone(), accuracy, a.total)
        })
        .collect();
    print_comparison(&args.benchmark, &rows, args.baseline.as_deref());
    Ok(())
}

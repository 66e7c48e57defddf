//! `membench results <runId>` — recompute metrics over stored rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;

use membench_core::domain::EvalResult;
use membench_core::traits::PackLookup;
use membench_metrics::{MetricContext, MetricRegistry};
use membench_packs::PackRegistry;
use membench_storage::{GroupAggregate, ResultsStore};

use crate::output::{heading, print_comparison, print_metric_results, Listing};
use crate::Context;

#[derive(Debug, Args)]
pub struct ResultsArgs {
    /// Run id to inspect
    run_id: String,

    /// Metrics to compute over the stored rows (comma-separated)
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// Per-question-type and per-category breakdowns
    #[arg(long)]
    breakdown: bool,

    /// Compare these providers against each other (comma-separated)
    #[arg(long, value_delimiter = ',')]
    compare: Vec<String>,
}

pub async fn execute(ctx: &Context, args: ResultsArgs) -> Result<()> {
    let store = ResultsStore::open(&ctx.results_db()).await?;
    let Some(run) = store.get_run(&args.run_id).await? else {
        bail!(
            "run '{}' not found in {}",
            args.run_id,
            ctx.results_db().display()
        );
    };

    heading(&format!("Run {}", run.id));
    ctx.writer.info(&format!(
        "started {}, benchmarks: {}, providers: {}",
        run.started_at.to_rfc3339(),
        run.benchmarks.join(", "),
        run.providers.join(", ")
    ));

    let aggregates = store.aggregate_pairs(&args.run_id).await?;
    let mut listing = Listing::new(&["Benchmark", "Provider", "Total", "Correct", "Avg score"]);
    for aggregate in &aggregates {
        let cells = vec![
            aggregate.benchmark.clone(),
            aggregate.provider.clone(),
            aggregate.total.to_string(),
            aggregate.correct.to_string(),
            format!("{:.4}", aggregate.avg_score),
        ];
        listing.row(aggregate, cells)?;
    }
    ctx.writer.render(listing)?;

    if !args.metrics.is_empty() {
        let registry = MetricRegistry::with_defaults();
        let packs: Arc<dyn PackLookup> = Arc::new(PackRegistry::with_defaults());
        let metric_ctx = MetricContext::with_packs(packs);

        let results = store.results_for_run(&args.run_id).await?;
        let mut by_pair: BTreeMap<(String, String), Vec<EvalResult>> = BTreeMap::new();
        for result in results {
            by_pair
                .entry((result.benchmark.clone(), result.provider.clone()))
                .or_default()
                .push(result);
        }
        for ((benchmark, provider), pair_results) in &by_pair {
            heading(&format!("{benchmark} × {provider}"));
            let computed = registry.compute_all(&args.metrics, pair_results, &metric_ctx)?;
            print_metric_results(&computed);
        }
    }

    if args.breakdown {
        render_breakdown(
            ctx,
            "By question type",
            &store.aggregate_by_question_type(&args.run_id).await?,
        )?;
        render_breakdown(
            ctx,
            "By category",
            &store.aggregate_by_category(&args.run_id).await?,
        )?;
    }

    if !args.compare.is_empty() {
        for benchmark in &run.benchmarks {
            let comparison = store
                .compare_providers(&args.run_id, benchmark, &args.compare)
                .await?;
            if comparison.is_empty() {
                continue;
            }
            let rows: Vec<(String, f64, i64)> = comparison
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
            print_comparison(benchmark, &rows, None);
        }
    }

    Ok(())
}

fn render_breakdown(ctx: &Context, title: &str, groups: &[GroupAggregate]) -> Result<()> {
    heading(title);
    let mut listing = Listing::new(&["Group", "Total", "Correct", "Avg score"]);
    for group in groups {
        let cells = vec![
            group.group.clone(),
            group.total.to_string(),
            group.correct.to_string(),
            format!("{:.4}", group.avg_score),
        ];
        listing.row(group, cells)?;
    }
    ctx.writer.render(listing)
}

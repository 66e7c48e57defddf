//! `membench eval` — the benchmark × provider cross-product.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use membench_core::traits::ItemFilters;
use membench_evaluators::ModelRouter;
use membench_runner::{CheckpointManager, RunRequest, Runner, DEFAULT_CONCURRENCY, POLICIES};
use membench_storage::ResultsStore;

use crate::adapters::factory_for;
use crate::config::load_config_dir;
use crate::output::print_pair_reports;
use crate::Context;

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Benchmarks to run (comma-separated)
    #[arg(long, value_delimiter = ',')]
    benchmarks: Vec<String>,

    /// Providers to drive (comma-separated)
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,

    /// Maximum number of items per benchmark
    #[arg(long)]
    limit: Option<usize>,

    /// 1-indexed inclusive range start
    #[arg(long)]
    start: Option<usize>,

    /// 1-indexed inclusive range end
    #[arg(long)]
    end: Option<usize>,

    /// Only items of this question type
    #[arg(long)]
    question_type: Option<String>,

    /// Expand to the code benchmarks of this task type (function|line|api|all)
    #[arg(long)]
    task_type: Option<String>,

    /// Parallel (benchmark, provider) pairs in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Metric names overriding the benchmarks' configured sets
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// Retrieval policy (1-hop|H-hop|all); multi-hop is an extension point
    #[arg(long)]
    policy: Option<String>,

    /// Resume or pin a run id
    #[arg(long)]
    run_id: Option<String>,
}

pub async fn execute(ctx: &Context, args: EvalArgs) -> Result<()> {
    if let Some(policy) = &args.policy {
        anyhow::ensure!(
            POLICIES.contains(&policy.as_str()),
            "unknown policy '{policy}'; expected one of {}",
            POLICIES.join(", ")
        );
    }

    let mut benchmarks = args.benchmarks.clone();
    if let Some(task_type) = &args.task_type {
        let expanded: Vec<String> = match task_type.as_str() {
            "all" => ["function", "line", "api"]
                .iter()
                .map(|t| format!("code-retrieval-{t}"))
                .collect(),
            t => vec![format!("code-retrieval-{t}")],
        };
        benchmarks.extend(expanded);
        benchmarks.dedup();
    }
    anyhow::ensure!(!benchmarks.is_empty(), "no benchmarks selected; pass --benchmarks");
    anyhow::ensure!(!args.providers.is_empty(), "no providers selected; pass --providers");

    tokio::fs::create_dir_all(&ctx.output_dir)
        .await
        .with_context(|| format!("creating {}", ctx.output_dir.display()))?;
    let store = ResultsStore::open(&ctx.results_db()).await?;
    let checkpoints = CheckpointManager::new(ctx.checkpoints_dir());
    let model = Arc::new(ModelRouter::new());

    let mut runner = Runner::new(store, checkpoints, model);
    let packs = membench_packs::PackRegistry::with_defaults();
    let configs = load_config_dir(&ctx.config_dir, &packs)?;
    for benchmark in configs.benchmarks {
        runner.register_benchmark(benchmark)?;
    }
    for provider in configs.providers {
        let factory = factory_for(&provider);
        runner.register_provider(provider, factory)?;
    }

    // ctrl-c drains the in-flight item and still runs cleanup
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static progress template"),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    let mut progress = runner.subscribe_progress();
    let progress_task = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while let Ok(event) = progress.recv().await {
                let accuracy = event
                    .accuracy
                    .map(|a| format!(" accuracy {:.1}%", a * 100.0))
                    .unwrap_or_default();
                spinner.set_message(format!(
                    "{} × {} [{:?} {}/{}]{accuracy}",
                    event.benchmark, event.provider, event.phase, event.current, event.total
                ));
            }
        })
    };

    let request = RunRequest {
        run_id: args.run_id.clone(),
        benchmarks,
        providers: args.providers.clone(),
        filters: ItemFilters {
            question_type: args.question_type.clone(),
            start: args.start,
            end: args.end,
            limit: args.limit,
        },
        concurrency: args.concurrency,
        metrics: args.metrics.clone(),
        policy: args.policy.clone(),
    };

    let report = runner.run(request).await?;
    progress_task.abort();
    spinner.finish_and_clear();

    print_pair_reports(&report.pairs);
    ctx.writer.success(&format!(
        "run {} finished; results in {}",
        report.run_id,
        ctx.results_db().display()
    ));
    ctx.writer.info(&format!(
        "re-run with --run-id {} to resume failed or pending items",
        report.run_id
    ));
    Ok(())
}

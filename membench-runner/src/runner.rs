//! The execution engine: drives the benchmark × provider cross-product
//! through INIT → INGEST → EVALUATE → CLEANUP under bounded concurrency,
//! checkpointing every item so runs resume exactly where they stopped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use membench_core::domain::{
    BenchmarkConfig, BenchmarkItem, EvalResult, PairReport, Phase, PreparedData, ProviderConfig,
    RunRecord, RunReport, SearchOptions,
};
use membench_core::traits::{EvalContext, ItemFilters, ModelClient, Provider, RunContext};
use membench_core::{
    validate_sealed_semantics, CoreError, Registry, Result, Telemetry, Timer,
};
use membench_evaluators::EvaluatorRegistry;
use membench_loaders::LoaderRegistry;
use membench_metrics::{MetricContext, MetricRegistry};
use membench_packs::PackRegistry;
use membench_storage::ResultsStore;

use crate::checkpoint::CheckpointManager;
use crate::provider::{ProviderFactory, ProviderRegistry};

pub const DEFAULT_CONCURRENCY: usize = 10;

pub const POLICIES: [&str; 3] = ["1-hop", "H-hop", "all"];

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run_id: Option<String>,
    pub benchmarks: Vec<String>,
    pub providers: Vec<String>,
    pub filters: ItemFilters,
    pub concurrency: usize,
    /// Overrides every benchmark's configured metric set when non-empty.
    pub metrics: Vec<String>,
    pub policy: Option<String>,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            run_id: None,
            benchmarks: Vec::new(),
            providers: Vec::new(),
            filters: ItemFilters::default(),
            concurrency: DEFAULT_CONCURRENCY,
            metrics: Vec::new(),
            policy: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub benchmark: String,
    pub provider: String,
    pub phase: Phase,
    pub current: usize,
    pub total: usize,
    pub accuracy: Option<f64>,
}

pub struct Runner {
    benchmarks: Registry<BenchmarkConfig>,
    providers: ProviderRegistry,
    loaders: Arc<LoaderRegistry>,
    evaluators: Arc<EvaluatorRegistry>,
    packs: Arc<PackRegistry>,
    metrics: Arc<MetricRegistry>,
    store: ResultsStore,
    checkpoints: Arc<CheckpointManager>,
    model: Arc<dyn ModelClient>,
    progress: broadcast::Sender<ProgressEvent>,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        store: ResultsStore,
        checkpoints: CheckpointManager,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        let (progress, _) = broadcast::channel(256);
        Self {
            benchmarks: Registry::new("benchmark"),
            providers: ProviderRegistry::new(),
            loaders: Arc::new(LoaderRegistry::with_defaults()),
            evaluators: Arc::new(EvaluatorRegistry::with_defaults()),
            packs: Arc::new(PackRegistry::with_defaults()),
            metrics: Arc::new(MetricRegistry::with_defaults()),
            store,
            checkpoints: Arc::new(checkpoints),
            model,
            progress,
            cancel: CancellationToken::new(),
        }
    }

    /// Registration must happen before `run`; registries are read-only
    /// once a run starts.
    pub fn register_benchmark(&mut self, config: BenchmarkConfig) -> Result<()> {
        let pack = self.packs.get_latest(&config.name);
        validate_sealed_semantics(&config, pack.as_deref())?;
        self.benchmarks.register(config.name.clone(), config)?;
        Ok(())
    }

    pub fn register_provider(
        &mut self,
        config: ProviderConfig,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<()> {
        self.providers.register(config, factory)?;
        Ok(())
    }

    pub fn register_loader(&mut self, registry: LoaderRegistry) {
        self.loaders = Arc::new(registry);
    }

    pub fn benchmark_names(&self) -> Vec<String> {
        self.benchmarks.keys()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys()
    }

    pub fn benchmark(&self, name: &str) -> Option<&BenchmarkConfig> {
        self.benchmarks.get(name)
    }

    pub fn provider_config(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name).map(|entry| &entry.config)
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// Token for cooperative cancellation: the in-flight item finishes,
    /// cleanup still runs, partial results stay in the store.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the full cross-product. Unknown benchmark, provider, or
    /// metric names abort before any work begins.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport> {
        if request.benchmarks.is_empty() || request.providers.is_empty() {
            return Err(CoreError::Validation(
                "at least one benchmark and one provider are required".to_string(),
            ));
        }
        for name in &request.benchmarks {
            let config = self.benchmarks.get_required(name)?;
            if !config.metrics.is_empty() {
                self.metrics.select(&config.metrics)?;
            }
        }
        for name in &request.providers {
            self.providers.get_required(name)?;
        }
        if !request.metrics.is_empty() {
            self.metrics.select(&request.metrics)?;
        }
        if let Some(policy) = &request.policy {
            if !POLICIES.contains(&policy.as_str()) {
                return Err(CoreError::Validation(format!(
                    "unknown policy '{policy}'; expected one of {}",
                    POLICIES.join(", ")
                )));
            }
            // Multi-hop retrieval is an extension point; every policy
            // currently executes single-hop search.
        }

        let run_id = request
            .run_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if self.store.get_run(&run_id).await?.is_none() {
            let record = RunRecord::new(
                &run_id,
                request.benchmarks.clone(),
                request.providers.clone(),
            )
            .with_config(json!({
                "concurrency": request.concurrency,
                "metrics": request.metrics,
                "policy": request.policy,
            }));
            self.store.insert_run(&record).await?;
        }

        info!(
            run_id = %run_id,
            benchmarks = request.benchmarks.len(),
            providers = request.providers.len(),
            "starting run"
        );

        let worker = Arc::new(PairWorker {
            run_id: run_id.clone(),
            filters: request.filters.clone(),
            metric_override: request.metrics.clone(),
            benchmarks: Arc::new(self.benchmarks.clone()),
            providers: Arc::new(self.providers.clone()),
            loaders: self.loaders.clone(),
            evaluators: self.evaluators.clone(),
            packs: self.packs.clone(),
            metrics: self.metrics.clone(),
            store: self.store.clone(),
            checkpoints: self.checkpoints.clone(),
            model: self.model.clone(),
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
        });

        let semaphore = Arc::new(Semaphore::new(request.concurrency.max(1)));
        let mut handles = Vec::new();
        for benchmark in &request.benchmarks {
            for provider in &request.providers {
                let worker = worker.clone();
                let semaphore = semaphore.clone();
                let benchmark = benchmark.clone();
                let provider = provider.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed");
                    worker.run_pair(&benchmark, &provider).await
                }));
            }
        }

        let mut report = RunReport::new(&run_id);
        for handle in handles {
            match handle.await {
                Ok(pair) => report.pairs.push(pair),
                Err(e) => error!(error = %e, "pair task panicked"),
            }
        }

        self.store.complete_run(&run_id).await?;
        Ok(report)
    }
}

/// Everything one (benchmark, provider) task needs, cloned out of the
/// runner so tasks own their state.
struct PairWorker {
    run_id: String,
    filters: ItemFilters,
    metric_override: Vec<String>,
    benchmarks: Arc<Registry<BenchmarkConfig>>,
    providers: Arc<ProviderRegistry>,
    loaders: Arc<LoaderRegistry>,
    evaluators: Arc<EvaluatorRegistry>,
    packs: Arc<PackRegistry>,
    metrics: Arc<MetricRegistry>,
    store: ResultsStore,
    checkpoints: Arc<CheckpointManager>,
    model: Arc<dyn ModelClient>,
    progress: broadcast::Sender<ProgressEvent>,
    cancel: CancellationToken,
}

/// Per-pair execution state shared by the ingest and evaluate phases.
struct PairState<'a> {
    config: &'a BenchmarkConfig,
    provider_config: &'a ProviderConfig,
    items: &'a [BenchmarkItem],
    handle: &'a dyn Provider,
    run_tag: &'a str,
    run_ctx: &'a RunContext,
    options: SearchOptions,
    resumable: bool,
}

impl PairState<'_> {
    fn min_delay(&self) -> Option<Duration> {
        self.provider_config
            .rate_limit
            .min_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

impl PairWorker {
    async fn run_pair(&self, benchmark: &str, provider: &str) -> PairReport {
        match self.try_run_pair(benchmark, provider).await {
            Ok(report) => report,
            Err(e) => {
                error!(benchmark, provider, error = %e, "pair aborted");
                PairReport {
                    benchmark: benchmark.to_string(),
                    provider: provider.to_string(),
                    total_items: 0,
                    completed_items: 0,
                    failed_items: 0,
                    accuracy: 0.0,
                    metrics: Vec::new(),
                    results: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_run_pair(&self, benchmark: &str, provider: &str) -> Result<PairReport> {
        // INIT
        let entry = self.providers.get_required(provider)?.clone();
        let config = self.benchmarks.get_required(benchmark)?.clone();
        let handle = entry.factory.create(&entry.config).await?;
        handle.initialize().await?;

        let loader = self.loaders.resolve(benchmark);
        let items = loader.load(&config, &self.filters).await?;
        let run_tag = entry.config.scoping.run_tag(benchmark, &self.run_id);
        self.checkpoints
            .load_or_create(&self.run_id, benchmark, provider)
            .await?;

        let run_ctx = RunContext {
            run_id: self.run_id.clone(),
            run_tag: run_tag.clone(),
            benchmark: benchmark.to_string(),
            provider: provider.to_string(),
            evaluation: config.evaluation.clone(),
            model: self.model.clone(),
        };

        let mut options = SearchOptions::from(&config.search);
        if !entry.config.capabilities.supports_chunks {
            options.include_chunks = false;
        }

        let state = PairState {
            config: &config,
            provider_config: &entry.config,
            items: &items,
            handle: handle.as_ref(),
            run_tag: &run_tag,
            run_ctx: &run_ctx,
            options,
            resumable: config.runtime.resumable,
        };

        self.ingest(&state).await?;
        self.evaluate(&state).await?;

        // CLEANUP: best-effort, failures are warnings only
        if let Err(e) = handle.clear(&run_tag).await {
            warn!(benchmark, provider, error = %e, "provider clear failed");
        }
        if let Err(e) = handle.cleanup().await {
            warn!(benchmark, provider, error = %e, "provider cleanup failed");
        }

        let results = self
            .store
            .results_for_pair(&self.run_id, benchmark, provider)
            .await?;
        let metric_names = if !self.metric_override.is_empty() {
            self.metric_override.clone()
        } else if !config.metrics.is_empty() {
            config.metrics.clone()
        } else {
            vec!["accuracy".to_string()]
        };
        let metric_ctx = MetricContext::with_packs(self.packs.clone());
        let metrics = self
            .metrics
            .compute_all(&metric_names, &results, &metric_ctx)?;

        let failed_items = self
            .checkpoints
            .snapshot(&self.run_id, benchmark, provider)
            .await
            .map(|cp| cp.count_failed_since(Phase::Search))
            .unwrap_or(0);

        Ok(PairReport {
            benchmark: benchmark.to_string(),
            provider: provider.to_string(),
            total_items: items.len(),
            completed_items: results.len(),
            failed_items,
            accuracy: PairReport::accuracy_of(&results),
            metrics,
            results,
            error: None,
        })
    }

    async fn ingest(&self, state: &PairState<'_>) -> Result<()> {
        let benchmark = state.run_ctx.benchmark.as_str();
        let provider = state.run_ctx.provider.as_str();

        // contexts deduped by id across items, in item order
        let mut seen = HashSet::new();
        let contexts: Vec<&PreparedData> = state
            .items
            .iter()
            .flat_map(|item| item.contexts.iter())
            .filter(|ctx| seen.insert(ctx.id.clone()))
            .collect();
        let total = contexts.len();
        info!(benchmark, provider, contexts = total, "ingest phase");

        for (index, context) in contexts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(benchmark, provider, "cancellation requested; draining ingest");
                break;
            }
            if state.resumable
                && self
                    .checkpoints
                    .should_skip(&self.run_id, benchmark, provider, &context.id, Phase::Ingest)
                    .await
            {
                continue;
            }

            self.checkpoints
                .mark_in_progress(&self.run_id, benchmark, provider, &context.id, Phase::Ingest)
                .await?;
            match state.handle.add_context(context, state.run_tag).await {
                Ok(()) => {
                    self.checkpoints
                        .mark_complete(&self.run_id, benchmark, provider, &context.id, Phase::Ingest)
                        .await?;
                }
                Err(e) => {
                    warn!(benchmark, provider, context = %context.id, error = %e, "context ingest failed");
                    self.checkpoints
                        .mark_failed(
                            &self.run_id,
                            benchmark,
                            provider,
                            &context.id,
                            Phase::Ingest,
                            e.to_string(),
                        )
                        .await?;
                }
            }

            if let Some(delay) = state.min_delay() {
                tokio::time::sleep(delay).await;
            }
            let ingestion = &state.config.ingestion;
            if ingestion.batch_delay_ms > 0 && (index + 1) % ingestion.batch_size.max(1) == 0 {
                tokio::time::sleep(Duration::from_millis(ingestion.batch_delay_ms)).await;
            }

            self.emit(ProgressEvent {
                benchmark: benchmark.to_string(),
                provider: provider.to_string(),
                phase: Phase::Ingest,
                current: index + 1,
                total,
                accuracy: None,
            });
        }
        Ok(())
    }

    async fn evaluate(&self, state: &PairState<'_>) -> Result<()> {
        let benchmark = state.run_ctx.benchmark.as_str();
        let provider = state.run_ctx.provider.as_str();

        // sealed packs own evaluation; everything else dispatches through
        // the evaluator registry
        let pack = self
            .packs
            .get_latest(benchmark)
            .filter(|p| p.sealed().scoring);
        let evaluator = match &pack {
            Some(_) => None,
            None => Some(self.evaluators.resolve(&state.config.evaluation)?),
        };

        let mut evaluated = 0usize;
        let mut correct = 0usize;
        for (index, item) in state.items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(benchmark, provider, "cancellation requested; draining evaluate");
                break;
            }
            if state.resumable
                && self
                    .checkpoints
                    .should_skip(&self.run_id, benchmark, provider, &item.id, Phase::Evaluate)
                    .await
            {
                continue;
            }

            // search and evaluation are checkpointed as separate phases
            self.checkpoints
                .mark_in_progress(&self.run_id, benchmark, provider, &item.id, Phase::Search)
                .await?;

            let total_timer = Timer::start();
            let search_timer = Timer::start();
            let retrieved = match state
                .handle
                .search(&item.question, state.run_tag, &state.options)
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    warn!(benchmark, provider, item = %item.id, error = %e, "search failed");
                    self.checkpoints
                        .mark_failed(
                            &self.run_id,
                            benchmark,
                            provider,
                            &item.id,
                            Phase::Search,
                            e.to_string(),
                        )
                        .await?;
                    continue;
                }
            };
            let search_latency_ms = search_timer.elapsed_ms();
            self.checkpoints
                .mark_complete(&self.run_id, benchmark, provider, &item.id, Phase::Search)
                .await?;

            self.checkpoints
                .mark_in_progress(&self.run_id, benchmark, provider, &item.id, Phase::Evaluate)
                .await?;
            let evaluation = {
                let ctx = EvalContext {
                    item,
                    retrieved: &retrieved,
                    run: state.run_ctx,
                };
                match &pack {
                    Some(pack) => pack.evaluate(&ctx).await,
                    None => {
                        evaluator
                            .as_ref()
                            .expect("evaluator resolved when no pack owns scoring")
                            .evaluate(&ctx)
                            .await
                    }
                }
            };
            let evaluation = match evaluation {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    warn!(benchmark, provider, item = %item.id, error = %e, "evaluation failed");
                    self.checkpoints
                        .mark_failed(
                            &self.run_id,
                            benchmark,
                            provider,
                            &item.id,
                            Phase::Evaluate,
                            e.to_string(),
                        )
                        .await?;
                    continue;
                }
            };

            let telemetry = Telemetry {
                search_latency_ms,
                total_latency_ms: total_timer.elapsed_ms(),
                answer_latency_ms: evaluation.answer_latency_ms,
                judge_latency_ms: evaluation.judge_latency_ms,
                prompt_tokens: evaluation.usage.map(|u| u.prompt_tokens),
                completion_tokens: evaluation.usage.map(|u| u.completion_tokens),
            };
            let mut metadata = item.metadata.clone();
            if let Some(judge_response) = &evaluation.judge_response {
                metadata.insert(
                    "judgeResponse".to_string(),
                    serde_json::Value::String(judge_response.clone()),
                );
            }
            if let Some(reasoning) = &evaluation.reasoning {
                metadata.insert(
                    "reasoning".to_string(),
                    serde_json::Value::String(reasoning.clone()),
                );
            }
            telemetry.merge_into(&mut metadata);

            let result = EvalResult {
                run_id: self.run_id.clone(),
                benchmark: benchmark.to_string(),
                provider: provider.to_string(),
                item_id: item.id.clone(),
                question: item.question.clone(),
                expected: item.answer.clone(),
                actual: evaluation.answer.clone(),
                score: evaluation.score,
                correct: evaluation.correct,
                retrieved,
                metadata,
                created_at: Utc::now(),
            };
            self.store.upsert_result(&result).await?;
            self.checkpoints
                .mark_complete(&self.run_id, benchmark, provider, &item.id, Phase::Evaluate)
                .await?;

            evaluated += 1;
            if evaluation.correct {
                correct += 1;
            }
            if let Some(delay) = state.min_delay() {
                tokio::time::sleep(delay).await;
            }
            self.emit(ProgressEvent {
                benchmark: benchmark.to_string(),
                provider: provider.to_string(),
                phase: Phase::Evaluate,
                current: index + 1,
                total: state.items.len(),
                accuracy: Some(correct as f64 / evaluated as f64),
            });
        }
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        let _ = self.progress.send(event);
    }
}

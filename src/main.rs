//! Cortex daemon and CLI entry point.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use cortex_runtime::adapters::providers::{AnthropicDriver, GoogleDriver, GroqDriver, MockDriver, OpenAiDriver};
use cortex_runtime::adapters::sqlite::{
    connect_database, SqliteAlertRepository, SqliteAttentionLog, SqliteGoalRepository, SqliteLearningRepository,
    SqliteMemoryRepository, SqliteNeuronRepository, SqliteOptimizationRepository, SqliteProactiveRepository,
    SqliteReflectionRepository, SqliteStateSnapshotRepository, SqliteThoughtRepository,
};
use cortex_runtime::cli::commands::{goal, health, memory, migrate};
use cortex_runtime::cli::{Cli, Commands};
use cortex_runtime::domain::errors::DomainResult;
use cortex_runtime::domain::models::{StateSnapshot, ThoughtKind, ThoughtPriority};
use cortex_runtime::domain::ports::{ProviderDriver, StateSnapshotRepository};
use cortex_runtime::infrastructure::config::ConfigLoader;
use cortex_runtime::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl};
use cortex_runtime::services::handlers::memory::HashFallbackEmbedding;
use cortex_runtime::services::handlers::{
    awareness::AwarenessHandler, goals::GoalsHandler, learning::LearningHandler, memory::MemoryHandler,
    proactive::ProactiveHandler, reasoning::ReasoningHandler, self_optimization::SelfOptimizationHandler,
};
use cortex_runtime::services::scheduler::{Scheduler, ThoughtHandler, ThoughtSink};
use cortex_runtime::services::{
    AttentionManager, GoalService, LoopSupervisor, MemoryService, ProcessMetrics, ProviderGateway, RoutingGraphService,
    StoreFacade,
};

/// Forwards `emit_thought` to whichever scheduler is installed after
/// construction. Handlers need `Arc<dyn ThoughtSink>` before the scheduler
/// that implements it exists, so this sits in between: it's built first,
/// handed to the handlers, and pointed at the real scheduler once built.
struct DeferredSink {
    inner: OnceLock<Arc<dyn ThoughtSink>>,
}

impl DeferredSink {
    fn new() -> Self {
        Self { inner: OnceLock::new() }
    }

    fn bind(&self, sink: Arc<dyn ThoughtSink>) {
        self.inner.set(sink).ok().expect("deferred sink bound twice");
    }
}

#[async_trait]
impl ThoughtSink for DeferredSink {
    async fn emit_thought(&self, payload: Value, kind: ThoughtKind, priority: ThoughtPriority) -> DomainResult<Uuid> {
        self.inner.get().expect("deferred sink used before scheduler was built").emit_thought(payload, kind, priority).await
    }
}

fn bridge_log_config(logging: &cortex_runtime::domain::models::LoggingConfig) -> LogConfig {
    LogConfig {
        level: logging.level.clone(),
        format: if logging.format.eq_ignore_ascii_case("pretty") { LogFormat::Pretty } else { LogFormat::Json },
        log_dir: None,
        enable_stdout: true,
        rotation: Default::default(),
        retention_days: logging.retention_days,
    }
}

/// Build the provider chain from whichever API keys are present in the
/// environment, lowest rank tried first; falls back to a scripted mock so
/// the daemon still starts in an offline/dev environment.
fn build_provider_chain() -> Vec<(Arc<dyn ProviderDriver>, u32)> {
    let mut drivers: Vec<(Arc<dyn ProviderDriver>, u32)> = Vec::new();

    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        drivers.push((Arc::new(AnthropicDriver::new(key)), 0));
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        drivers.push((Arc::new(OpenAiDriver::new(key)), 1));
    }
    if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
        drivers.push((Arc::new(GoogleDriver::new(key)), 2));
    }
    if let Ok(key) = std::env::var("GROQ_API_KEY") {
        drivers.push((Arc::new(GroqDriver::new(key)), 3));
    }

    if drivers.is_empty() {
        warn!("no provider API keys configured; falling back to the mock driver");
        drivers.push((Arc::new(MockDriver::fixed("mock", "no provider configured")), 0));
    }

    drivers
}

async fn serve() -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;

    let _logger = LoggerImpl::init(&bridge_log_config(&config.logging)).context("failed to initialize logging")?;
    info!(environment = %config.environment, "starting cortex");

    let pool = connect_database(&config.database.url)
        .await
        .context("failed to reach the cortex store (run `cortex migrate` if the schema is out of date)")?;

    let store = Arc::new(StoreFacade::new(
        pool.clone(),
        cortex_runtime::services::DdlPolicy {
            environment: config.environment.clone(),
            runtime_ddl_enabled: config.database.enable_runtime_ddl,
        },
        config.database.max_retries,
    ));

    let alert_repo = Arc::new(SqliteAlertRepository::new(pool.clone()));
    let goal_repo = Arc::new(SqliteGoalRepository::new(pool.clone()));
    let learning_repo = Arc::new(SqliteLearningRepository::new(pool.clone()));
    let memory_repo = Arc::new(SqliteMemoryRepository::new(pool.clone()));
    let optimization_repo = Arc::new(SqliteOptimizationRepository::new(pool.clone()));
    let proactive_repo = Arc::new(SqliteProactiveRepository::new(pool.clone()));
    let thought_repo = Arc::new(SqliteThoughtRepository::new(pool.clone()));
    let reflection_repo = Arc::new(SqliteReflectionRepository::new(pool.clone()));
    let attention_log = Arc::new(SqliteAttentionLog::new(pool.clone()));
    let neuron_repo = Arc::new(SqliteNeuronRepository::new(pool.clone()));
    let state_snapshot_repo = Arc::new(SqliteStateSnapshotRepository::new(pool.clone()));

    let gateway = Arc::new(ProviderGateway::new(build_provider_chain(), config.gateway.clone()));
    let routing_graph = Arc::new(RoutingGraphService::new(neuron_repo));
    let process_metrics = Arc::new(ProcessMetrics::default());

    let goal_service = GoalService::new(goal_repo.clone());
    let memory_service_for_handler = MemoryService::new(memory_repo.clone());
    let memory_service_for_optimizer = Arc::new(MemoryService::new(memory_repo.clone()));

    let attention = Arc::new(AttentionManager::new(goal_repo.clone(), attention_log, config.attention.clone()));

    let deferred_sink = Arc::new(DeferredSink::new());
    let sink: Arc<dyn ThoughtSink> = deferred_sink.clone();

    let awareness_handler =
        Arc::new(AwarenessHandler::new(alert_repo, sink.clone(), attention.clone(), config.alerts.clone()));
    let goals_handler = Arc::new(GoalsHandler::new(goal_service));
    let learning_handler = Arc::new(LearningHandler::new(learning_repo, sink));
    let memory_handler = Arc::new(MemoryHandler::new(
        memory_service_for_handler,
        Arc::new(HashFallbackEmbedding { dim: 32 }),
    ));
    let proactive_handler = Arc::new(ProactiveHandler::new(goal_repo.clone(), proactive_repo));
    let reasoning_handler = Arc::new(ReasoningHandler::new(gateway.clone(), store.clone()));
    let self_optimization_handler = Arc::new(SelfOptimizationHandler::new(
        gateway.clone(),
        memory_service_for_optimizer,
        optimization_repo,
        config.alerts.memory,
    ));

    let mut handlers: HashMap<ThoughtKind, Arc<dyn ThoughtHandler>> = HashMap::new();
    handlers.insert(ThoughtKind::Alert, awareness_handler.clone());
    handlers.insert(ThoughtKind::AlertRaised, awareness_handler.clone());
    handlers.insert(ThoughtKind::GoalUpdate, goals_handler);
    handlers.insert(ThoughtKind::LearningEvent, learning_handler.clone());
    handlers.insert(ThoughtKind::MemoryRequest, memory_handler);
    handlers.insert(ThoughtKind::Prediction, proactive_handler.clone());
    handlers.insert(ThoughtKind::External, proactive_handler.clone());
    handlers.insert(ThoughtKind::ReasoningRequest, reasoning_handler);
    handlers.insert(ThoughtKind::OptimizationRequest, self_optimization_handler.clone());

    let scheduler = Arc::new(Scheduler::new(thought_repo, reflection_repo, config.scheduler.clone(), handlers));
    deferred_sink.bind(scheduler.clone());

    let supervisor = LoopSupervisor::new();

    {
        let scheduler = scheduler.clone();
        supervisor.spawn("scheduler-main-loop", async move { scheduler.run_main_loop().await }).await;
    }
    {
        let scheduler = scheduler.clone();
        supervisor.spawn("scheduler-reflection-loop", async move { scheduler.run_reflection_loop().await }).await;
    }
    {
        let memory = Arc::new(MemoryService::new(memory_repo.clone()));
        supervisor
            .spawn("memory-maintenance", async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(60));
                loop {
                    ticker.tick().await;
                    if let Err(error) = memory.run_maintenance().await {
                        error!(%error, "memory maintenance pass failed");
                    }
                }
            })
            .await;
    }
    {
        let attention = attention.clone();
        let proactive = proactive_handler.clone();
        let interval_secs = config.scheduler.attention_interval_secs.max(1);
        supervisor
            .spawn("attention-tick", async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    let candidates = proactive.attention_candidates().await.unwrap_or_default();
                    if let Err(error) = attention.tick(candidates).await {
                        error!(%error, "attention tick failed");
                    }
                }
            })
            .await;
    }
    {
        let learning = learning_handler;
        supervisor
            .spawn("learning-extraction", async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(300));
                loop {
                    ticker.tick().await;
                    if let Err(error) = learning.extract_patterns().await {
                        error!(%error, "pattern extraction failed");
                    }
                    if let Err(error) = learning.detect_regression().await {
                        error!(%error, "regression detection failed");
                    }
                }
            })
            .await;
    }
    {
        let scheduler = scheduler.clone();
        let attention = attention.clone();
        let interval_secs = config.scheduler.state_persistence_interval_secs.max(1);
        supervisor
            .spawn("state-persistence", async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    let health = scheduler.health().await;
                    let focus = attention.current_focus().await;
                    let snapshot = StateSnapshot::new(
                        if health.shutting_down { "shutting_down" } else { "active" },
                        focus,
                        health.pending as u64,
                        serde_json::json!({
                            "processed_total": health.processed_total,
                            "errored_total": health.errored_total,
                            "success_rate": health.success_rate,
                        }),
                    );
                    if let Err(error) = state_snapshot_repo.record_snapshot(&snapshot).await {
                        error!(%error, "state snapshot persistence failed");
                    }
                }
            })
            .await;
    }
    {
        let awareness = awareness_handler.clone();
        let self_optimization = self_optimization_handler.clone();
        let process_metrics = process_metrics.clone();
        let interval_secs = config.scheduler.metrics_collection_interval_secs.max(1);
        supervisor
            .spawn("metrics-collection", async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    let memory_pct = process_metrics.memory_pct();
                    if let Err(error) = awareness.observe_metric("memory", memory_pct).await {
                        error!(%error, "memory metric observation failed");
                    }
                    match self_optimization.optimize_if_over_threshold(memory_pct).await {
                        Ok(Some(_)) => info!(memory_pct, "self-optimization ran over memory threshold"),
                        Ok(None) => {}
                        Err(error) => error!(%error, "self-optimization pass failed"),
                    }
                }
            })
            .await;
    }
    {
        let routing_graph = routing_graph.clone();
        let interval_secs = config.scheduler.state_persistence_interval_secs.max(1);
        supervisor
            .spawn("routing-graph-hebbian-batch", async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    if let Err(error) = routing_graph.run_hebbian_batch().await {
                        error!(%error, "hebbian batch failed");
                    }
                    if let Err(error) = routing_graph.decay_inactive().await {
                        error!(%error, "synapse decay pass failed");
                    }
                }
            })
            .await;
    }

    info!("cortex is running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;

    info!("shutdown requested");
    scheduler.request_shutdown();
    supervisor.shutdown().await;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve().await,
        Commands::Migrate => migrate::execute(cli.database_url, cli.json).await,
        Commands::Health => health::execute(cli.database_url, cli.json).await,
        Commands::Goal(cmd) => goal::execute(cmd, cli.database_url, cli.json).await,
        Commands::Memory(cmd) => memory::execute(cmd, cli.database_url, cli.json).await,
    }
}

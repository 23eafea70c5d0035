//! Metacognitive scheduler.
//!
//! Owns the thought stream: a priority queue fed by external callers and
//! by the runtime's own background loops, drained on a fixed-budget
//! cycle and routed by [`ThoughtKind`] to a bound handler.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Insight, Reflection, SchedulerConfig, Thought, ThoughtKind, ThoughtPriority};
use crate::domain::ports::{ReflectionRepository, ThoughtRepository};

/// Binds one [`ThoughtKind`] to a subsystem. Each of the seven subsystem
/// handlers (awareness, memory, goals, learning, proactive, reasoning,
/// self_optimization) implements this for the kinds it owns.
#[async_trait]
pub trait ThoughtHandler: Send + Sync {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value>;
}

/// What a subsystem handler uses to enqueue a follow-up thought (e.g.
/// awareness emitting `alert_raised`) without depending on the concrete
/// [`Scheduler`] type.
#[async_trait]
pub trait ThoughtSink: Send + Sync {
    async fn emit_thought(&self, payload: Value, kind: ThoughtKind, priority: ThoughtPriority) -> DomainResult<Uuid>;
}

#[async_trait]
impl<R: ThoughtRepository> ThoughtSink for Scheduler<R> {
    async fn emit_thought(&self, payload: Value, kind: ThoughtKind, priority: ThoughtPriority) -> DomainResult<Uuid> {
        Scheduler::think(self, payload, kind, priority).await
    }
}

/// A handler that always fails; used for kinds nothing is bound to yet so
/// the scheduler can still run with a partial handler set.
pub struct UnboundHandler;

#[async_trait]
impl ThoughtHandler for UnboundHandler {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        Err(DomainError::ExecutionFailed(format!(
            "no handler bound for thought kind {:?}",
            thought.kind
        )))
    }
}

struct ThoughtQueue {
    buckets: [VecDeque<Thought>; 6],
}

impl ThoughtQueue {
    fn new() -> Self {
        Self {
            buckets: [
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
            ],
        }
    }

    fn push(&mut self, thought: Thought) {
        self.buckets[thought.priority.bucket_index()].push_back(thought);
    }

    /// Pop the highest-priority thought, ties broken by insertion order
    /// (each bucket is itself FIFO, which preserves `created_at` order).
    fn pop(&mut self) -> Option<Thought> {
        self.buckets.iter_mut().find_map(|bucket| bucket.pop_front())
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    fn depths(&self) -> [usize; 6] {
        let mut depths = [0usize; 6];
        for (i, bucket) in self.buckets.iter().enumerate() {
            depths[i] = bucket.len();
        }
        depths
    }
}

#[derive(Debug, Default, Clone)]
struct CycleStats {
    processed: u64,
    errored: u64,
}

impl CycleStats {
    fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            1.0
        } else {
            (self.processed - self.errored) as f64 / self.processed as f64
        }
    }
}

/// A point-in-time view of scheduler health, returned by [`Scheduler::health`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthSnapshot {
    pub pending: usize,
    pub bucket_depths: [usize; 6],
    pub processed_total: u64,
    pub errored_total: u64,
    pub success_rate: f64,
    pub shutting_down: bool,
}

/// Drains the thought stream and dispatches to subsystem handlers.
pub struct Scheduler<R: ThoughtRepository> {
    queue: Mutex<ThoughtQueue>,
    waiters: Mutex<HashMap<Uuid, oneshot::Sender<Value>>>,
    ring_buffer: Mutex<VecDeque<Thought>>,
    handlers: HashMap<ThoughtKind, Arc<dyn ThoughtHandler>>,
    repository: Arc<R>,
    reflections: Arc<dyn ReflectionRepository>,
    config: SchedulerConfig,
    stats: Mutex<CycleStats>,
    shutdown: Arc<AtomicBool>,
}

impl<R: ThoughtRepository> Scheduler<R> {
    pub fn new(
        repository: Arc<R>,
        reflections: Arc<dyn ReflectionRepository>,
        config: SchedulerConfig,
        handlers: HashMap<ThoughtKind, Arc<dyn ThoughtHandler>>,
    ) -> Self {
        Self {
            queue: Mutex::new(ThoughtQueue::new()),
            waiters: Mutex::new(HashMap::new()),
            ring_buffer: Mutex::new(VecDeque::with_capacity(config.ring_buffer_capacity.min(65536))),
            handlers,
            repository,
            reflections,
            config,
            stats: Mutex::new(CycleStats::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueue a new thought and return its id immediately; does not wait
    /// for it to be processed.
    #[instrument(skip(self, payload))]
    pub async fn think(&self, payload: Value, kind: ThoughtKind, priority: ThoughtPriority) -> DomainResult<Uuid> {
        let thought = Thought::new(kind, payload, "external", priority);
        let id = thought.id;
        self.repository.persist(&thought).await?;
        self.queue.lock().expect("thought queue poisoned").push(thought);
        Ok(id)
    }

    /// Enqueue a thought and register a waiter, then await its outcome or
    /// time out after `deadline`.
    async fn think_and_await(
        &self,
        payload: Value,
        kind: ThoughtKind,
        priority: ThoughtPriority,
        deadline: Duration,
    ) -> DomainResult<Value> {
        let thought = Thought::new(kind, payload, "direct_command", priority);
        let id = thought.id;
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().expect("waiters poisoned").insert(id, tx);
        self.repository.persist(&thought).await?;
        self.queue.lock().expect("thought queue poisoned").push(thought);

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(DomainError::ExecutionFailed("thought outcome channel dropped".to_string())),
            Err(_) => {
                self.waiters.lock().expect("waiters poisoned").remove(&id);
                Err(DomainError::ExecutionFailed(format!("decision {id} timed out")))
            }
        }
    }

    /// Create a reasoning thought for `context`/`options` and await its
    /// outcome, at the urgency requested by the caller.
    pub async fn decide(&self, context: Value, options: Value, urgency: ThoughtPriority) -> DomainResult<Value> {
        let payload = serde_json::json!({ "context": context, "options": options });
        self.think_and_await(payload, ThoughtKind::ReasoningRequest, urgency, Duration::from_secs(10)).await
    }

    /// Route a remember request through the memory handler.
    pub async fn remember(&self, data: Value, importance: f32) -> DomainResult<Value> {
        let payload = serde_json::json!({ "op": "remember", "data": data, "importance": importance });
        self.think_and_await(payload, ThoughtKind::MemoryRequest, ThoughtPriority::Normal, Duration::from_secs(5)).await
    }

    /// Route a recall request through the memory handler.
    pub async fn recall(&self, query: String, limit: usize) -> DomainResult<Value> {
        let payload = serde_json::json!({ "op": "recall", "query": query, "limit": limit });
        self.think_and_await(payload, ThoughtKind::MemoryRequest, ThoughtPriority::Normal, Duration::from_secs(5)).await
    }

    /// Route a goal creation request through the goals handler.
    pub async fn set_goal(&self, goal: Value) -> DomainResult<Value> {
        let payload = serde_json::json!({ "op": "create", "goal": goal });
        self.think_and_await(payload, ThoughtKind::GoalUpdate, ThoughtPriority::High, Duration::from_secs(5)).await
    }

    pub async fn health(&self) -> HealthSnapshot {
        let queue = self.queue.lock().expect("thought queue poisoned");
        let stats = self.stats.lock().expect("stats poisoned").clone();
        HealthSnapshot {
            pending: queue.len(),
            bucket_depths: queue.depths(),
            processed_total: stats.processed,
            errored_total: stats.errored,
            success_rate: stats.success_rate(),
            shutting_down: self.shutdown.load(Ordering::SeqCst),
        }
    }

    /// Summarize the recent thought stream into observations, insights
    /// drawn from them, and a self-assessment against the configured
    /// success floor. Persists the reflection and each insight, then
    /// returns the same shape it stored.
    pub async fn reflect(&self, topic: Option<String>) -> DomainResult<Value> {
        let recent = self.repository.list_recent(200).await?;
        let mut by_kind: HashMap<&str, u64> = HashMap::new();
        let mut errors = 0u64;
        for thought in &recent {
            *by_kind.entry(thought.kind.as_str()).or_insert(0) += 1;
            if let Some(outcome) = &thought.outcome {
                if outcome.get("error").is_some() {
                    errors += 1;
                }
            }
        }

        let observations: Vec<Value> = by_kind
            .iter()
            .map(|(kind, count)| serde_json::json!({ "kind": kind, "count": count }))
            .collect();

        let mut insights = Vec::new();
        if recent.is_empty() {
            insights.push("no thoughts observed in this window".to_string());
        } else {
            if errors > 0 {
                let error_rate = errors as f64 / recent.len() as f64;
                insights.push(format!("{:.1}% of sampled thoughts ended in error", error_rate * 100.0));
            }
            if let Some((dominant_kind, dominant_count)) = by_kind.iter().max_by_key(|(_, count)| **count) {
                insights.push(format!(
                    "{dominant_kind} is the dominant thought kind ({dominant_count} of {})",
                    recent.len()
                ));
            }
        }

        let success_rate = self.stats.lock().expect("stats poisoned").success_rate();
        let self_assessment = if success_rate < self.config.min_success_rate {
            format!(
                "success rate {success_rate:.2} is below the floor of {:.2}; degraded",
                self.config.min_success_rate
            )
        } else {
            format!(
                "success rate {success_rate:.2} meets the floor of {:.2}; healthy",
                self.config.min_success_rate
            )
        };

        let reflection = Reflection::new(topic.clone(), observations.clone(), insights.clone(), self_assessment.clone());
        if let Err(error) = self.reflections.record_reflection(&reflection).await {
            error!(error = %error, "failed to persist reflection");
        }
        for content in &insights {
            let insight = Insight::new(topic.clone(), content.clone());
            if let Err(error) = self.reflections.record_insight(&insight).await {
                error!(error = %error, "failed to persist insight");
            }
        }

        Ok(serde_json::json!({
            "observations": observations,
            "insights": insights,
            "self_assessment": self_assessment,
        }))
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn handler_for(&self, kind: ThoughtKind) -> Arc<dyn ThoughtHandler> {
        self.handlers.get(&kind).cloned().unwrap_or_else(|| Arc::new(UnboundHandler))
    }

    async fn process_one(&self, mut thought: Thought) {
        let id = thought.id;

        if thought.kind.is_terminal() {
            thought.acknowledge();
        } else {
            let handler = self.handler_for(thought.kind);
            match handler.handle(&thought).await {
                Ok(outcome) => thought.complete(outcome),
                Err(error) => {
                    error!(thought_id = %id, kind = thought.kind.as_str(), error = %error, "handler failed");
                    thought.complete(serde_json::json!({ "error": error.to_string() }));
                    self.stats.lock().expect("stats poisoned").errored += 1;
                }
            }
        }

        self.stats.lock().expect("stats poisoned").processed += 1;

        if let Err(error) = self.repository.persist(&thought).await {
            error!(thought_id = %id, error = %error, "failed to persist processed thought");
        }

        {
            let mut ring = self.ring_buffer.lock().expect("ring buffer poisoned");
            ring.push_back(thought.clone());
            while ring.len() > self.config.ring_buffer_capacity {
                ring.pop_front();
            }
        }

        if let Some(tx) = self.waiters.lock().expect("waiters poisoned").remove(&id) {
            let _ = tx.send(thought.outcome.clone().unwrap_or(Value::Null));
        }
    }

    /// The scheduler's main cycle: drain up to `batch_size` thoughts in
    /// priority order, dispatch each, then pad the remainder of the
    /// configured tick interval. Intended to be spawned via
    /// [`crate::services::loop_supervisor::LoopSupervisor`].
    pub async fn run_main_loop(self: Arc<Self>) -> anyhow::Result<()> {
        let tick_budget = Duration::from_millis(self.config.tick_interval_ms);
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("scheduler main loop observed shutdown flag, exiting");
                return Ok(());
            }

            let started = Instant::now();
            let batch: Vec<Thought> = {
                let mut queue = self.queue.lock().expect("thought queue poisoned");
                let mut batch = Vec::with_capacity(self.config.batch_size);
                for _ in 0..self.config.batch_size {
                    match queue.pop() {
                        Some(thought) => batch.push(thought),
                        None => break,
                    }
                }
                batch
            };

            for thought in batch {
                self.process_one(thought).await;
            }

            let pending = self.queue.lock().expect("thought queue poisoned").len();
            debug!(pending, "consciousness_tick");

            let elapsed = started.elapsed();
            if elapsed < tick_budget {
                tokio::time::sleep(tick_budget - elapsed).await;
            } else {
                warn!(elapsed_ms = elapsed.as_millis() as u64, budget_ms = tick_budget.as_millis() as u64, "scheduler cycle overran its budget");
            }
        }
    }

    /// Periodically samples the recent thought stream; emits a learning
    /// thought if the success rate drops below the configured floor.
    pub async fn run_reflection_loop(self: Arc<Self>) -> anyhow::Result<()> {
        let interval = Duration::from_secs(self.config.reflection_interval_secs);
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(());
            }

            let reflection = match self.reflect(None).await {
                Ok(reflection) => reflection,
                Err(error) => {
                    error!(error = %error, "reflection pass failed");
                    continue;
                }
            };

            let snapshot = self.health().await;
            if snapshot.success_rate < self.config.min_success_rate {
                let payload = serde_json::json!({
                    "reason": "success_rate_below_floor",
                    "success_rate": snapshot.success_rate,
                    "floor": self.config.min_success_rate,
                    "reflection": reflection,
                });
                if let Err(error) = self.think(payload, ThoughtKind::LearningEvent, ThoughtPriority::High).await {
                    error!(error = %error, "failed to enqueue reflection learning thought");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteReflectionRepository, SqliteThoughtRepository};

    struct EchoHandler;

    #[async_trait]
    impl ThoughtHandler for EchoHandler {
        async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
            Ok(serde_json::json!({ "echo": thought.payload.clone() }))
        }
    }

    async fn scheduler_with_echo() -> Arc<Scheduler<SqliteThoughtRepository>> {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteThoughtRepository::new(pool.clone()));
        let reflections = Arc::new(SqliteReflectionRepository::new(pool));
        let mut handlers: HashMap<ThoughtKind, Arc<dyn ThoughtHandler>> = HashMap::new();
        handlers.insert(ThoughtKind::ReasoningRequest, Arc::new(EchoHandler));
        handlers.insert(ThoughtKind::MemoryRequest, Arc::new(EchoHandler));
        handlers.insert(ThoughtKind::GoalUpdate, Arc::new(EchoHandler));
        Arc::new(Scheduler::new(
            repo,
            reflections,
            SchedulerConfig { tick_interval_ms: 10, ..SchedulerConfig::default() },
            handlers,
        ))
    }

    #[tokio::test]
    async fn test_think_enqueues_and_main_loop_processes_it() {
        let scheduler = scheduler_with_echo().await;
        let id = scheduler.think(serde_json::json!({"x":1}), ThoughtKind::ReasoningRequest, ThoughtPriority::Normal).await.unwrap();

        let loop_handle = tokio::spawn(scheduler.clone().run_main_loop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.request_shutdown();
        let _ = loop_handle.await;

        let stored = scheduler.repository.get(id).await.unwrap().unwrap();
        assert!(stored.processed);
    }

    #[tokio::test]
    async fn test_decide_awaits_outcome() {
        let scheduler = scheduler_with_echo().await;
        let loop_handle = tokio::spawn(scheduler.clone().run_main_loop());

        let outcome = scheduler
            .decide(serde_json::json!({"goal":"pick a provider"}), serde_json::json!(["a","b"]), ThoughtPriority::Urgent)
            .await
            .unwrap();

        assert!(outcome.get("echo").is_some());
        scheduler.request_shutdown();
        let _ = loop_handle.await;
    }

    #[tokio::test]
    async fn test_alert_raised_is_acknowledged_without_dispatch() {
        let scheduler = scheduler_with_echo().await;
        let id = scheduler
            .think(serde_json::json!({}), ThoughtKind::AlertRaised, ThoughtPriority::Critical)
            .await
            .unwrap();

        let loop_handle = tokio::spawn(scheduler.clone().run_main_loop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.request_shutdown();
        let _ = loop_handle.await;

        let stored = scheduler.repository.get(id).await.unwrap().unwrap();
        assert_eq!(stored.outcome.unwrap()["status"], serde_json::json!("acknowledged"));
    }

    #[tokio::test]
    async fn test_unbound_kind_records_error_outcome_but_still_processed() {
        let scheduler = scheduler_with_echo().await;
        let id = scheduler
            .think(serde_json::json!({}), ThoughtKind::OptimizationRequest, ThoughtPriority::Low)
            .await
            .unwrap();

        let loop_handle = tokio::spawn(scheduler.clone().run_main_loop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.request_shutdown();
        let _ = loop_handle.await;

        let stored = scheduler.repository.get(id).await.unwrap().unwrap();
        assert!(stored.processed);
        assert!(stored.outcome.unwrap().get("error").is_some());
    }

    #[tokio::test]
    async fn test_health_reports_pending_depth() {
        let scheduler = scheduler_with_echo().await;
        scheduler.think(serde_json::json!({}), ThoughtKind::External, ThoughtPriority::Maintenance).await.unwrap();
        let snapshot = scheduler.health().await;
        assert_eq!(snapshot.pending, 1);
    }

    #[tokio::test]
    async fn test_reflect_returns_documented_shape_and_persists() {
        let scheduler = scheduler_with_echo().await;
        let id = scheduler.think(serde_json::json!({"x": 1}), ThoughtKind::ReasoningRequest, ThoughtPriority::Normal).await.unwrap();

        let loop_handle = tokio::spawn(scheduler.clone().run_main_loop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.request_shutdown();
        let _ = loop_handle.await;

        let stored = scheduler.repository.get(id).await.unwrap().unwrap();
        assert!(stored.processed);

        let reflection = scheduler.reflect(Some("nightly".to_string())).await.unwrap();
        assert!(reflection.get("observations").is_some());
        assert!(reflection.get("insights").is_some());
        assert!(reflection.get("self_assessment").is_some());

        let insights = scheduler.reflections.list_recent_insights(10).await.unwrap();
        assert!(!insights.is_empty());
    }
}

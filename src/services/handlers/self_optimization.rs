//! Self-optimization handler: when process memory breaches threshold,
//! drops the reasoning cache and evicts the oldest working-memory
//! entries, then records the before/after improvement.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{OptimizationRecord, SelfHealingEvent, Thought};
use crate::domain::ports::{MemoryRepository, OptimizationRepository};
use crate::services::handlers::SubsystemHandler;
use crate::services::memory_service::MemoryService;
use crate::services::provider_gateway::ProviderGateway;
use crate::services::scheduler::ThoughtHandler;

pub struct SelfOptimizationHandler<R: MemoryRepository, O: OptimizationRepository> {
    gateway: Arc<ProviderGateway>,
    memory: Arc<MemoryService<R>>,
    repository: Arc<O>,
    memory_threshold_pct: f64,
}

impl<R: MemoryRepository, O: OptimizationRepository> SelfOptimizationHandler<R, O> {
    pub fn new(
        gateway: Arc<ProviderGateway>,
        memory: Arc<MemoryService<R>>,
        repository: Arc<O>,
        memory_threshold_pct: f64,
    ) -> Self {
        Self { gateway, memory, repository, memory_threshold_pct }
    }

    /// `current_memory_pct` is sampled by the caller (the process metrics
    /// loop); this handler only decides what to do about a breach.
    #[instrument(skip(self))]
    pub async fn optimize_if_over_threshold(&self, current_memory_pct: f64) -> DomainResult<Option<OptimizationRecord>> {
        if current_memory_pct < self.memory_threshold_pct {
            return Ok(None);
        }

        let before_cache = self.gateway.metrics().await.cache_size;
        let dropped_cache = self.gateway.clear_cache().await;
        let maintenance = self.memory.run_maintenance().await?;

        let before = serde_json::json!({
            "memory_pct": current_memory_pct,
            "cache_size": before_cache,
        });
        let after = serde_json::json!({
            "cache_size": before_cache - dropped_cache,
            "working_evicted": maintenance.working_evicted,
            "episodic_evicted": maintenance.episodic_evicted,
        });
        let freed = dropped_cache as f32 + maintenance.working_evicted as f32 + maintenance.episodic_evicted as f32;
        let improvement = if before_cache == 0 { 0.0 } else { (freed / before_cache.max(1) as f32).clamp(0.0, 1.0) };

        let record = OptimizationRecord::new(before, after, improvement);
        self.repository.record_optimization(&record).await?;

        let event = SelfHealingEvent::new(
            "memory_pressure_relief",
            serde_json::json!({ "dropped_cache_entries": dropped_cache, "evicted_memories": maintenance.working_evicted + maintenance.episodic_evicted }),
        );
        self.repository.record_self_healing_event(&event).await?;

        info!(improvement, dropped_cache, "self-optimization pass completed");
        Ok(Some(record))
    }
}

#[async_trait]
impl<R: MemoryRepository, O: OptimizationRepository> ThoughtHandler for SelfOptimizationHandler<R, O> {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        let memory_pct = thought
            .payload
            .get("memory_pct")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| DomainError::ValidationFailed("optimization request missing memory_pct".to_string()))?;

        let record = self.optimize_if_over_threshold(memory_pct).await?;
        Ok(match record {
            Some(record) => serde_json::json!({ "optimized": true, "improvement": record.improvement }),
            None => serde_json::json!({ "optimized": false }),
        })
    }
}

#[async_trait]
impl<R: MemoryRepository, O: OptimizationRepository> SubsystemHandler for SelfOptimizationHandler<R, O> {
    fn name(&self) -> &'static str {
        "self_optimization"
    }

    async fn health(&self) -> DomainResult<Value> {
        let recent = self.repository.list_recent_optimizations(5).await?;
        Ok(serde_json::json!({ "status": "healthy", "score": 1.0, "details": { "recent_optimizations": recent.len() } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::providers::mock::MockDriver;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteMemoryRepository, SqliteOptimizationRepository};
    use crate::domain::models::{GatewayConfig, MemoryType};

    async fn handler() -> SelfOptimizationHandler<SqliteMemoryRepository, SqliteOptimizationRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let driver = Arc::new(MockDriver::fixed("primary", "ok"));
        let gateway = Arc::new(ProviderGateway::new(vec![(driver, 0)], GatewayConfig::default()));
        let memory_repo = Arc::new(SqliteMemoryRepository::new(pool.clone()));
        let memory = Arc::new(MemoryService::new(memory_repo));
        let repository = Arc::new(SqliteOptimizationRepository::new(pool));
        SelfOptimizationHandler::new(gateway, memory, repository, 85.0)
    }

    #[tokio::test]
    async fn test_no_action_below_threshold() {
        let handler = handler().await;
        let result = handler.optimize_if_over_threshold(40.0).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_optimizes_and_records_above_threshold() {
        let handler = handler().await;
        handler.memory.remember(MemoryType::Working, "scratch".to_string(), 0.1).await.unwrap();

        let result = handler.optimize_if_over_threshold(90.0).await.unwrap();
        assert!(result.is_some());

        let events = handler.repository.list_recent_self_healing_events(5).await.unwrap();
        assert_eq!(events.len(), 1);
    }
}

//! Optimization repository port: optimization records and self-healing events.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OptimizationRecord, SelfHealingEvent};

#[async_trait]
pub trait OptimizationRepository: Send + Sync {
    async fn record_optimization(&self, record: &OptimizationRecord) -> DomainResult<()>;

    async fn list_recent_optimizations(&self, limit: usize) -> DomainResult<Vec<OptimizationRecord>>;

    async fn record_self_healing_event(&self, event: &SelfHealingEvent) -> DomainResult<()>;

    async fn list_recent_self_healing_events(&self, limit: usize) -> DomainResult<Vec<SelfHealingEvent>>;
}

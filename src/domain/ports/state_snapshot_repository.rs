//! State snapshot repository port: periodic captures of metacognitive state.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::StateSnapshot;

#[async_trait]
pub trait StateSnapshotRepository: Send + Sync {
    async fn record_snapshot(&self, snapshot: &StateSnapshot) -> DomainResult<()>;

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<StateSnapshot>>;
}

//! Goal repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Goal, GoalPriority, GoalStatus};

/// Filter criteria for listing goals.
#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    pub status: Option<GoalStatus>,
    pub priority: Option<GoalPriority>,
    pub parent_id: Option<Uuid>,
}

/// Repository interface for Goal persistence.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// Create a new goal.
    async fn create(&self, goal: &Goal) -> DomainResult<()>;

    /// Get a goal by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Goal>>;

    /// Update an existing goal.
    async fn update(&self, goal: &Goal) -> DomainResult<()>;

    /// Delete a goal by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// List goals with optional filters.
    async fn list(&self, filter: GoalFilter) -> DomainResult<Vec<Goal>>;

    /// Get all child goals of a parent.
    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Goal>>;

    /// Fetch several goals by id in one round trip, used to check whether
    /// a goal's declared dependencies have completed.
    async fn get_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Goal>>;

    /// Count goals by status.
    async fn count_by_status(&self) -> DomainResult<std::collections::HashMap<GoalStatus, u64>>;

    /// Top goals by priority rank, for the Priority Attention Manager (at
    /// most 10 per the attention algorithm).
    async fn get_top_by_priority(&self, limit: usize) -> DomainResult<Vec<Goal>>;
}

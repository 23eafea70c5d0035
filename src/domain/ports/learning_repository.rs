//! Learning repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Outcome, Pattern, PatternCategory};

/// Repository interface for learning outcomes and extracted patterns.
#[async_trait]
pub trait LearningRepository: Send + Sync {
    /// Record one observed outcome.
    async fn record_outcome(&self, outcome: &Outcome) -> DomainResult<()>;

    /// Outcomes for `action_type` created at or after `since`, oldest
    /// first, used by both pattern extraction and the regression check.
    async fn list_outcomes_since(
        &self,
        action_type: Option<&str>,
        since: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<Vec<Outcome>>;

    /// Insert a newly extracted pattern, or reinforce an existing one
    /// matching the same category and conditions.
    async fn upsert_pattern(&self, pattern: &Pattern) -> DomainResult<()>;

    async fn list_patterns(&self, category: Option<PatternCategory>) -> DomainResult<Vec<Pattern>>;
}

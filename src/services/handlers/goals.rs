//! Goals handler: wraps [`GoalService`] for scheduler dispatch.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{GoalLevel, GoalPriority, GoalStatus, Thought};
use crate::domain::ports::{GoalFilter, GoalRepository};
use crate::services::goal_service::GoalService;
use crate::services::handlers::SubsystemHandler;
use crate::services::scheduler::ThoughtHandler;

pub struct GoalsHandler<R: GoalRepository> {
    service: GoalService<R>,
}

impl<R: GoalRepository> GoalsHandler<R> {
    pub fn new(service: GoalService<R>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<R: GoalRepository> ThoughtHandler for GoalsHandler<R> {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        let op = thought.payload.get("op").and_then(|v| v.as_str()).unwrap_or("create");

        match op {
            "create" => {
                let goal = thought.payload.get("goal").cloned().unwrap_or(Value::Null);
                let title = goal.get("title").and_then(|v| v.as_str()).unwrap_or("untitled").to_string();
                let description = goal.get("description").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let level = goal
                    .get("level")
                    .and_then(|v| v.as_str())
                    .and_then(GoalLevel::from_str)
                    .unwrap_or_default();
                let priority = goal
                    .get("priority")
                    .and_then(|v| v.as_str())
                    .and_then(GoalPriority::from_str)
                    .unwrap_or_default();

                let created = self.service.create_goal(title, description, level, priority, None, Vec::new()).await?;
                Ok(serde_json::json!({ "goal_id": created.id }))
            }
            "update_status" => {
                let id = thought
                    .payload
                    .get("goal_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| uuid::Uuid::parse_str(s).ok())
                    .ok_or_else(|| DomainError::ValidationFailed("missing goal_id".to_string()))?;
                let status = thought
                    .payload
                    .get("status")
                    .and_then(|v| v.as_str())
                    .and_then(GoalStatus::from_str)
                    .ok_or_else(|| DomainError::ValidationFailed("missing or invalid status".to_string()))?;
                let updated = self.service.transition_status(id, status).await?;
                Ok(serde_json::json!({ "goal_id": updated.id, "status": updated.status.as_str() }))
            }
            "update_progress" => {
                let id = thought
                    .payload
                    .get("goal_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| uuid::Uuid::parse_str(s).ok())
                    .ok_or_else(|| DomainError::ValidationFailed("missing goal_id".to_string()))?;
                let progress = thought.payload.get("progress").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
                let updated = self.service.set_progress(id, progress).await?;
                Ok(serde_json::json!({ "goal_id": updated.id, "progress": updated.progress }))
            }
            other => Err(DomainError::ValidationFailed(format!("unknown goal op {other}"))),
        }
    }
}

#[async_trait]
impl<R: GoalRepository> SubsystemHandler for GoalsHandler<R> {
    fn name(&self) -> &'static str {
        "goals"
    }

    async fn health(&self) -> DomainResult<Value> {
        let counts = self.service.list_goals(GoalFilter::default()).await?.len();
        Ok(serde_json::json!({ "status": "healthy", "score": 1.0, "details": { "total_goals": counts } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository};
    use crate::domain::models::ThoughtKind;
    use crate::domain::models::ThoughtPriority;
    use std::sync::Arc;

    async fn handler() -> GoalsHandler<SqliteGoalRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteGoalRepository::new(pool));
        GoalsHandler::new(GoalService::new(repo))
    }

    #[tokio::test]
    async fn test_create_op_returns_goal_id() {
        let handler = handler().await;
        let thought = Thought::new(
            ThoughtKind::GoalUpdate,
            serde_json::json!({ "op": "create", "goal": { "title": "Ship v2", "priority": "high" } }),
            "test",
            ThoughtPriority::High,
        );
        let outcome = handler.handle(&thought).await.unwrap();
        assert!(outcome.get("goal_id").is_some());
    }

    #[tokio::test]
    async fn test_update_progress_op() {
        let handler = handler().await;
        let create = Thought::new(
            ThoughtKind::GoalUpdate,
            serde_json::json!({ "op": "create", "goal": { "title": "Ship v2" } }),
            "test",
            ThoughtPriority::High,
        );
        let outcome = handler.handle(&create).await.unwrap();
        let goal_id = outcome["goal_id"].as_str().unwrap();

        let update = Thought::new(
            ThoughtKind::GoalUpdate,
            serde_json::json!({ "op": "update_progress", "goal_id": goal_id, "progress": 0.5 }),
            "test",
            ThoughtPriority::Normal,
        );
        let outcome = handler.handle(&update).await.unwrap();
        assert_eq!(outcome["progress"], serde_json::json!(0.5));
    }
}

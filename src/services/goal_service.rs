//! Goal service: application logic over the goal repository.
//!
//! Handles creation, status transitions gated by dependency satisfaction,
//! and progress rollup from a parent's children.

use std::sync::Arc;
use uuid::Uuid;

use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalLevel, GoalPriority, GoalStatus};
use crate::domain::ports::{GoalFilter, GoalRepository};

pub struct GoalService<R: GoalRepository> {
    repository: Arc<R>,
}

impl<R: GoalRepository> GoalService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create a new goal, attaching it to `parent_id` if given.
    #[instrument(skip(self))]
    pub async fn create_goal(
        &self,
        title: String,
        description: String,
        level: GoalLevel,
        priority: GoalPriority,
        parent_id: Option<Uuid>,
        dependencies: Vec<Uuid>,
    ) -> DomainResult<Goal> {
        let mut parent = match parent_id {
            Some(pid) => Some(
                self.repository
                    .get(pid)
                    .await?
                    .ok_or(DomainError::GoalNotFound(pid))?,
            ),
            None => None,
        };

        let mut goal = Goal::new(title, description).with_level(level).with_priority(priority);
        for dep in dependencies {
            goal = goal.with_dependency(dep);
        }
        if let Some(pid) = parent_id {
            goal = goal.with_parent(pid);
        }
        goal.validate().map_err(DomainError::ValidationFailed)?;

        self.repository.create(&goal).await?;

        if let Some(parent) = parent.as_mut() {
            parent.add_child(goal.id);
            self.repository.update(parent).await?;
        }

        info!(goal_id = %goal.id, title = %goal.title, "goal created");
        Ok(goal)
    }

    pub async fn get_goal(&self, id: Uuid) -> DomainResult<Option<Goal>> {
        self.repository.get(id).await
    }

    pub async fn list_goals(&self, filter: GoalFilter) -> DomainResult<Vec<Goal>> {
        self.repository.list(filter).await
    }

    /// Top goals by priority, for the Priority Attention Manager.
    pub async fn top_goals(&self, limit: usize) -> DomainResult<Vec<Goal>> {
        self.repository.get_top_by_priority(limit).await
    }

    /// Transition a goal's status, enforcing the dependency gate on entry to
    /// `InProgress`.
    #[instrument(skip(self))]
    pub async fn transition_status(&self, id: Uuid, new_status: GoalStatus) -> DomainResult<Goal> {
        let mut goal = self.repository.get(id).await?.ok_or(DomainError::GoalNotFound(id))?;
        let from_status = goal.status;

        let completed_ids = if new_status == GoalStatus::InProgress {
            let deps = self.repository.get_many(&goal.dependencies).await?;
            deps.into_iter()
                .filter(|d| d.status == GoalStatus::Completed)
                .map(|d| d.id)
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        goal.transition_to(new_status, &completed_ids)
            .map_err(|_| DomainError::InvalidStateTransition {
                from: from_status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            })?;

        self.repository.update(&goal).await?;

        if let Some(parent_id) = goal.parent_id {
            self.recompute_parent_progress(parent_id).await?;
        }

        info!(goal_id = %goal.id, from = from_status.as_str(), to = new_status.as_str(), "goal status transitioned");
        Ok(goal)
    }

    /// Set a leaf goal's own progress, then roll the change up to its parent.
    #[instrument(skip(self))]
    pub async fn set_progress(&self, id: Uuid, progress: f32) -> DomainResult<Goal> {
        let mut goal = self.repository.get(id).await?.ok_or(DomainError::GoalNotFound(id))?;
        if !goal.children.is_empty() {
            return Err(DomainError::ValidationFailed(
                "cannot set progress directly on a goal with children".to_string(),
            ));
        }
        goal.set_progress(progress);
        self.repository.update(&goal).await?;

        if let Some(parent_id) = goal.parent_id {
            self.recompute_parent_progress(parent_id).await?;
        }

        Ok(goal)
    }

    async fn recompute_parent_progress(&self, parent_id: Uuid) -> DomainResult<()> {
        let mut parent = self.repository.get(parent_id).await?.ok_or(DomainError::GoalNotFound(parent_id))?;
        let children = self.repository.get_many(&parent.children).await?;
        let progress: Vec<f32> = children.iter().map(|c| c.progress).collect();
        parent.recompute_progress_from_children(&progress);
        self.repository.update(&parent).await?;

        if let Some(grandparent_id) = parent.parent_id {
            Box::pin(self.recompute_parent_progress(grandparent_id)).await?;
        }
        Ok(())
    }

    /// Delete a goal. Refuses if it still has children.
    #[instrument(skip(self))]
    pub async fn delete_goal(&self, id: Uuid) -> DomainResult<()> {
        let children = self.repository.get_children(id).await?;
        if !children.is_empty() {
            return Err(DomainError::ValidationFailed(
                "cannot delete a goal with children; delete children first".to_string(),
            ));
        }
        self.repository.get(id).await?.ok_or(DomainError::GoalNotFound(id))?;
        self.repository.delete(id).await?;
        info!(goal_id = %id, "goal deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository};

    async fn setup_service() -> GoalService<SqliteGoalRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteGoalRepository::new(pool));
        GoalService::new(repo)
    }

    #[tokio::test]
    async fn test_create_goal() {
        let service = setup_service().await;
        let goal = service
            .create_goal(
                "Test".to_string(),
                "Description".to_string(),
                GoalLevel::Operational,
                GoalPriority::High,
                None,
                vec![],
            )
            .await
            .unwrap();

        assert_eq!(goal.title, "Test");
        assert_eq!(goal.priority, GoalPriority::High);
        assert_eq!(goal.status, GoalStatus::Pending);
    }

    #[tokio::test]
    async fn test_transition_status_requires_dependencies() {
        let service = setup_service().await;
        let dep = service
            .create_goal("Dep".to_string(), "".to_string(), GoalLevel::Operational, GoalPriority::Medium, None, vec![])
            .await
            .unwrap();
        let goal = service
            .create_goal(
                "Main".to_string(),
                "".to_string(),
                GoalLevel::Operational,
                GoalPriority::Medium,
                None,
                vec![dep.id],
            )
            .await
            .unwrap();

        let blocked = service.transition_status(goal.id, GoalStatus::InProgress).await;
        assert!(blocked.is_err());

        service.transition_status(dep.id, GoalStatus::Active).await.unwrap();
        service.transition_status(dep.id, GoalStatus::InProgress).await.unwrap();
        service.transition_status(dep.id, GoalStatus::Completed).await.unwrap();

        let unblocked = service.transition_status(goal.id, GoalStatus::InProgress).await.unwrap();
        assert_eq!(unblocked.status, GoalStatus::InProgress);
    }

    #[tokio::test]
    async fn test_progress_rolls_up_to_parent() {
        let service = setup_service().await;
        let parent = service
            .create_goal("Parent".to_string(), "".to_string(), GoalLevel::Strategic, GoalPriority::Medium, None, vec![])
            .await
            .unwrap();
        let child_a = service
            .create_goal("Child A".to_string(), "".to_string(), GoalLevel::Operational, GoalPriority::Medium, Some(parent.id), vec![])
            .await
            .unwrap();
        let child_b = service
            .create_goal("Child B".to_string(), "".to_string(), GoalLevel::Operational, GoalPriority::Medium, Some(parent.id), vec![])
            .await
            .unwrap();

        service.set_progress(child_a.id, 1.0).await.unwrap();
        service.set_progress(child_b.id, 0.5).await.unwrap();

        let parent = service.get_goal(parent.id).await.unwrap().unwrap();
        assert!((parent.progress - 0.75).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_delete_refuses_goal_with_children() {
        let service = setup_service().await;
        let parent = service
            .create_goal("Parent".to_string(), "".to_string(), GoalLevel::Strategic, GoalPriority::Medium, None, vec![])
            .await
            .unwrap();
        service
            .create_goal("Child".to_string(), "".to_string(), GoalLevel::Operational, GoalPriority::Medium, Some(parent.id), vec![])
            .await
            .unwrap();

        let result = service.delete_goal(parent.id).await;
        assert!(result.is_err());
    }
}

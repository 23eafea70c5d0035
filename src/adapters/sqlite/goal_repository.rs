//! SQLite implementation of the GoalRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Goal, GoalLevel, GoalPriority, GoalStatus};
use crate::domain::ports::{GoalFilter, GoalRepository};

const GOAL_COLUMNS: &str = "id, title, description, level, priority, status, parent_id, \
     children, progress, deadline, dependencies, created_at, updated_at, version";

#[derive(Clone)]
pub struct SqliteGoalRepository {
    pool: SqlitePool,
}

impl SqliteGoalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoalRepository for SqliteGoalRepository {
    async fn create(&self, goal: &Goal) -> DomainResult<()> {
        let children_json = serde_json::to_string(&goal.children)?;
        let dependencies_json = serde_json::to_string(&goal.dependencies)?;

        sqlx::query(
            r#"INSERT INTO goals
               (id, title, description, level, priority, status, parent_id,
                children, progress, deadline, dependencies, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(goal.id.to_string())
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.level.as_str())
        .bind(goal.priority.as_str())
        .bind(goal.status.as_str())
        .bind(goal.parent_id.map(|id| id.to_string()))
        .bind(&children_json)
        .bind(goal.progress)
        .bind(goal.deadline.map(|d| d.to_rfc3339()))
        .bind(&dependencies_json)
        .bind(goal.created_at.to_rfc3339())
        .bind(goal.updated_at.to_rfc3339())
        .bind(goal.version as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Goal>> {
        let row: Option<GoalRow> = sqlx::query_as(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, goal: &Goal) -> DomainResult<()> {
        let children_json = serde_json::to_string(&goal.children)?;
        let dependencies_json = serde_json::to_string(&goal.dependencies)?;

        let result = sqlx::query(
            r#"UPDATE goals SET title = ?, description = ?, level = ?, priority = ?,
               status = ?, parent_id = ?, children = ?, progress = ?, deadline = ?,
               dependencies = ?, updated_at = ?, version = ?
               WHERE id = ?"#,
        )
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.level.as_str())
        .bind(goal.priority.as_str())
        .bind(goal.status.as_str())
        .bind(goal.parent_id.map(|id| id.to_string()))
        .bind(&children_json)
        .bind(goal.progress)
        .bind(goal.deadline.map(|d| d.to_rfc3339()))
        .bind(&dependencies_json)
        .bind(goal.updated_at.to_rfc3339())
        .bind(goal.version as i64)
        .bind(goal.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::GoalNotFound(goal.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::GoalNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filter: GoalFilter) -> DomainResult<Vec<Goal>> {
        let mut query = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }

        if let Some(priority) = &filter.priority {
            query.push_str(" AND priority = ?");
            bindings.push(priority.as_str().to_string());
        }

        if let Some(parent_id) = &filter.parent_id {
            query.push_str(" AND parent_id = ?");
            bindings.push(parent_id.to_string());
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, GoalRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<GoalRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Goal>> {
        let rows: Vec<GoalRow> = sqlx::query_as(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE parent_id = ? ORDER BY created_at"
        ))
        .bind(parent_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Goal>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let query = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id IN ({placeholders})");

        let mut q = sqlx::query_as::<_, GoalRow>(&query);
        for id in ids {
            q = q.bind(id.to_string());
        }

        let rows: Vec<GoalRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count_by_status(&self) -> DomainResult<HashMap<GoalStatus, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) as count FROM goals GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Some(status) = GoalStatus::from_str(&status_str) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }

    async fn get_top_by_priority(&self, limit: usize) -> DomainResult<Vec<Goal>> {
        let rows: Vec<GoalRow> = sqlx::query_as(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals \
             WHERE status NOT IN ('completed', 'failed', 'cancelled') \
             ORDER BY priority DESC, created_at ASC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct GoalRow {
    id: String,
    title: String,
    description: Option<String>,
    level: String,
    priority: String,
    status: String,
    parent_id: Option<String>,
    children: Option<String>,
    progress: f32,
    deadline: Option<String>,
    dependencies: Option<String>,
    created_at: String,
    updated_at: String,
    version: i64,
}

impl TryFrom<GoalRow> for Goal {
    type Error = DomainError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let parent_id = super::parse_optional_uuid(row.parent_id)?;

        let level = GoalLevel::from_str(&row.level)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid level: {}", row.level)))?;
        let priority = GoalPriority::from_str(&row.priority)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid priority: {}", row.priority)))?;
        let status = GoalStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        let children: Vec<Uuid> = super::parse_json_or_default(row.children)?;
        let dependencies: Vec<Uuid> = super::parse_json_or_default(row.dependencies)?;

        let created_at = super::parse_datetime(&row.created_at)?;
        let updated_at = super::parse_datetime(&row.updated_at)?;
        let deadline = super::parse_optional_datetime(row.deadline)?;

        Ok(Goal {
            id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            level,
            priority,
            status,
            parent_id,
            children,
            progress: row.progress,
            deadline,
            dependencies,
            created_at,
            updated_at,
            version: row.version as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteGoalRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteGoalRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_goal() {
        let repo = setup_test_repo().await;
        let goal = Goal::new("Test Goal", "Description");

        repo.create(&goal).await.unwrap();

        let retrieved = repo.get(goal.id).await.unwrap();
        assert!(retrieved.is_some());
        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.title, "Test Goal");
        assert_eq!(retrieved.status, GoalStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_goal() {
        let repo = setup_test_repo().await;
        let mut goal = Goal::new("Original", "Description");
        repo.create(&goal).await.unwrap();

        goal.title = "Updated".to_string();
        goal.updated_at = chrono::Utc::now();
        repo.update(&goal).await.unwrap();

        let retrieved = repo.get(goal.id).await.unwrap().unwrap();
        assert_eq!(retrieved.title, "Updated");
    }

    #[tokio::test]
    async fn test_delete_goal() {
        let repo = setup_test_repo().await;
        let goal = Goal::new("To Delete", "Description");
        repo.create(&goal).await.unwrap();

        repo.delete(goal.id).await.unwrap();

        let retrieved = repo.get(goal.id).await.unwrap();
        assert!(retrieved.is_none());
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let repo = setup_test_repo().await;

        let goal1 = Goal::new("Active Goal", "Desc").with_priority(GoalPriority::High);
        let mut goal2 = Goal::new("Blocked Goal", "Desc");
        goal2.status = GoalStatus::Blocked;

        repo.create(&goal1).await.unwrap();
        repo.create(&goal2).await.unwrap();

        let pending_goals = repo
            .list(GoalFilter { status: Some(GoalStatus::Pending), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(pending_goals.len(), 1);
        assert_eq!(pending_goals[0].title, "Active Goal");
    }

    #[tokio::test]
    async fn test_get_many() {
        let repo = setup_test_repo().await;
        let goal1 = Goal::new("One", "");
        let goal2 = Goal::new("Two", "");
        repo.create(&goal1).await.unwrap();
        repo.create(&goal2).await.unwrap();

        let fetched = repo.get_many(&[goal1.id, goal2.id]).await.unwrap();
        assert_eq!(fetched.len(), 2);
    }

    #[tokio::test]
    async fn test_get_top_by_priority_excludes_terminal() {
        let repo = setup_test_repo().await;
        let open = Goal::new("Open", "").with_priority(GoalPriority::Critical);
        let mut done = Goal::new("Done", "").with_priority(GoalPriority::Critical);
        done.status = GoalStatus::Completed;

        repo.create(&open).await.unwrap();
        repo.create(&done).await.unwrap();

        let top = repo.get_top_by_priority(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, open.id);
    }
}

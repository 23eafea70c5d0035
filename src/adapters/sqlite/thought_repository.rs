//! SQLite implementation of the ThoughtRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Thought, ThoughtKind, ThoughtPriority};
use crate::domain::ports::ThoughtRepository;

const THOUGHT_COLUMNS: &str =
    "id, created_at, kind, payload, source, priority, processed, outcome, linked";

#[derive(Clone)]
pub struct SqliteThoughtRepository {
    pool: SqlitePool,
}

impl SqliteThoughtRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThoughtRepository for SqliteThoughtRepository {
    async fn persist(&self, thought: &Thought) -> DomainResult<()> {
        let outcome_json = thought.outcome.as_ref().map(|v| v.to_string());
        let linked_json = serde_json::to_string(&thought.linked)?;

        sqlx::query(
            r#"INSERT INTO thought_stream
               (id, created_at, kind, payload, source, priority, processed, outcome, linked)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 processed = excluded.processed,
                 outcome = excluded.outcome,
                 linked = excluded.linked"#,
        )
        .bind(thought.id.to_string())
        .bind(thought.created_at.to_rfc3339())
        .bind(thought.kind.as_str())
        .bind(thought.payload.to_string())
        .bind(&thought.source)
        .bind(thought.priority.as_str())
        .bind(thought.processed)
        .bind(outcome_json)
        .bind(&linked_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Thought>> {
        let row: Option<ThoughtRow> = sqlx::query_as(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thought_stream WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<Thought>> {
        let rows: Vec<ThoughtRow> = sqlx::query_as(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thought_stream ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ThoughtRow {
    id: String,
    created_at: String,
    kind: String,
    payload: String,
    source: String,
    priority: String,
    processed: bool,
    outcome: Option<String>,
    linked: Option<String>,
}

impl TryFrom<ThoughtRow> for Thought {
    type Error = DomainError;

    fn try_from(row: ThoughtRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let kind = ThoughtKind::from_str(&row.kind)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid thought kind: {}", row.kind)))?;
        let priority = ThoughtPriority::from_str(&row.priority)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid priority: {}", row.priority)))?;

        let payload: serde_json::Value = serde_json::from_str(&row.payload)?;
        let outcome: Option<serde_json::Value> =
            row.outcome.map(|o| serde_json::from_str(&o)).transpose()?;
        let linked: Vec<Uuid> = super::parse_json_or_default(row.linked)?;
        let created_at = super::parse_datetime(&row.created_at)?;

        Ok(Thought {
            id,
            created_at,
            kind,
            payload,
            source: row.source,
            priority,
            processed: row.processed,
            outcome,
            linked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteThoughtRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteThoughtRepository::new(pool)
    }

    #[tokio::test]
    async fn test_persist_and_get() {
        let repo = setup_test_repo().await;
        let thought = Thought::new(
            ThoughtKind::External,
            serde_json::json!({"note": "hello"}),
            "external",
            ThoughtPriority::Normal,
        );

        repo.persist(&thought).await.unwrap();

        let fetched = repo.get(thought.id).await.unwrap().unwrap();
        assert_eq!(fetched.kind, ThoughtKind::External);
        assert!(!fetched.processed);
    }

    #[tokio::test]
    async fn test_persist_upserts_completion() {
        let repo = setup_test_repo().await;
        let mut thought = Thought::new(
            ThoughtKind::GoalUpdate,
            serde_json::json!({}),
            "goals",
            ThoughtPriority::High,
        );
        repo.persist(&thought).await.unwrap();

        thought.complete(serde_json::json!({"ok": true}));
        repo.persist(&thought).await.unwrap();

        let fetched = repo.get(thought.id).await.unwrap().unwrap();
        assert!(fetched.processed);
        assert_eq!(fetched.outcome.unwrap()["ok"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_list_recent() {
        let repo = setup_test_repo().await;
        let thought = Thought::new(
            ThoughtKind::Alert,
            serde_json::json!({}),
            "awareness",
            ThoughtPriority::Urgent,
        );
        repo.persist(&thought).await.unwrap();

        let recent = repo.list_recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}

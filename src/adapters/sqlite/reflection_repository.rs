//! SQLite implementation of the ReflectionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Insight, Reflection};
use crate::domain::ports::ReflectionRepository;

#[derive(Clone)]
pub struct SqliteReflectionRepository {
    pool: SqlitePool,
}

impl SqliteReflectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReflectionRepository for SqliteReflectionRepository {
    async fn record_reflection(&self, reflection: &Reflection) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO reflections (id, created_at, topic, observations, insights, self_assessment) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(reflection.id.to_string())
        .bind(reflection.created_at.to_rfc3339())
        .bind(&reflection.topic)
        .bind(serde_json::to_string(&reflection.observations)?)
        .bind(serde_json::to_string(&reflection.insights)?)
        .bind(&reflection.self_assessment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_insight(&self, insight: &Insight) -> DomainResult<()> {
        sqlx::query("INSERT INTO insights (id, topic, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(insight.id.to_string())
            .bind(&insight.topic)
            .bind(&insight.content)
            .bind(insight.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_recent_insights(&self, limit: usize) -> DomainResult<Vec<Insight>> {
        let rows: Vec<InsightRow> =
            sqlx::query_as("SELECT id, topic, content, created_at FROM insights ORDER BY created_at DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct InsightRow {
    id: String,
    topic: Option<String>,
    content: String,
    created_at: String,
}

impl TryFrom<InsightRow> for Insight {
    type Error = DomainError;

    fn try_from(row: InsightRow) -> Result<Self, Self::Error> {
        Ok(Insight { id: super::parse_uuid(&row.id)?, topic: row.topic, content: row.content, created_at: super::parse_datetime(&row.created_at)? })
    }
}

//! SQLite implementation of the OptimizationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{OptimizationRecord, SelfHealingEvent};
use crate::domain::ports::OptimizationRepository;

#[derive(Clone)]
pub struct SqliteOptimizationRepository {
    pool: SqlitePool,
}

impl SqliteOptimizationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OptimizationRepository for SqliteOptimizationRepository {
    async fn record_optimization(&self, record: &OptimizationRecord) -> DomainResult<()> {
        sqlx::query("INSERT INTO optimizations (id, before, after, improvement, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(record.id.to_string())
            .bind(record.before.to_string())
            .bind(record.after.to_string())
            .bind(record.improvement)
            .bind(record.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_recent_optimizations(&self, limit: usize) -> DomainResult<Vec<OptimizationRecord>> {
        let rows: Vec<OptimizationRow> = sqlx::query_as(
            "SELECT id, before, after, improvement, created_at FROM optimizations ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn record_self_healing_event(&self, event: &SelfHealingEvent) -> DomainResult<()> {
        sqlx::query("INSERT INTO self_healing_events (id, kind, detail, created_at) VALUES (?, ?, ?, ?)")
            .bind(event.id.to_string())
            .bind(&event.kind)
            .bind(event.detail.to_string())
            .bind(event.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_recent_self_healing_events(&self, limit: usize) -> DomainResult<Vec<SelfHealingEvent>> {
        let rows: Vec<SelfHealingEventRow> = sqlx::query_as(
            "SELECT id, kind, detail, created_at FROM self_healing_events ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct OptimizationRow {
    id: String,
    before: String,
    after: String,
    improvement: f32,
    created_at: String,
}

impl TryFrom<OptimizationRow> for OptimizationRecord {
    type Error = DomainError;

    fn try_from(row: OptimizationRow) -> Result<Self, Self::Error> {
        Ok(OptimizationRecord {
            id: super::parse_uuid(&row.id)?,
            before: serde_json::from_str(&row.before)?,
            after: serde_json::from_str(&row.after)?,
            improvement: row.improvement,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SelfHealingEventRow {
    id: String,
    kind: String,
    detail: String,
    created_at: String,
}

impl TryFrom<SelfHealingEventRow> for SelfHealingEvent {
    type Error = DomainError;

    fn try_from(row: SelfHealingEventRow) -> Result<Self, Self::Error> {
        Ok(SelfHealingEvent {
            id: super::parse_uuid(&row.id)?,
            kind: row.kind,
            detail: serde_json::from_str(&row.detail)?,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

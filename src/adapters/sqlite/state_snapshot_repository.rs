//! SQLite implementation of the StateSnapshotRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::StateSnapshot;
use crate::domain::ports::StateSnapshotRepository;

#[derive(Clone)]
pub struct SqliteStateSnapshotRepository {
    pool: SqlitePool,
}

impl SqliteStateSnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateSnapshotRepository for SqliteStateSnapshotRepository {
    async fn record_snapshot(&self, snapshot: &StateSnapshot) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO metacognitive_state_snapshots
             (id, captured_at, consciousness_state, attention_focus, pending_count, metrics)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(snapshot.id.to_string())
        .bind(snapshot.captured_at.to_rfc3339())
        .bind(&snapshot.consciousness_state)
        .bind(&snapshot.attention_focus)
        .bind(snapshot.pending_count as i64)
        .bind(snapshot.metrics.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<StateSnapshot>> {
        let rows: Vec<StateSnapshotRow> = sqlx::query_as(
            "SELECT id, captured_at, consciousness_state, attention_focus, pending_count, metrics
             FROM metacognitive_state_snapshots ORDER BY captured_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct StateSnapshotRow {
    id: String,
    captured_at: String,
    consciousness_state: String,
    attention_focus: Option<String>,
    pending_count: i64,
    metrics: String,
}

impl TryFrom<StateSnapshotRow> for StateSnapshot {
    type Error = DomainError;

    fn try_from(row: StateSnapshotRow) -> Result<Self, Self::Error> {
        Ok(StateSnapshot {
            id: super::parse_uuid(&row.id)?,
            captured_at: super::parse_datetime(&row.captured_at)?,
            consciousness_state: row.consciousness_state,
            attention_focus: row.attention_focus,
            pending_count: row.pending_count as u64,
            metrics: serde_json::from_str(&row.metrics)?,
        })
    }
}

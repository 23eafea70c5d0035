//! SQLite-backed append-only attention log.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::services::attention_manager::{AttentionLog, AttentionShift};

#[derive(Clone)]
pub struct SqliteAttentionLog {
    pool: SqlitePool,
}

impl SqliteAttentionLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttentionLog for SqliteAttentionLog {
    async fn append(&self, shift: &AttentionShift) -> DomainResult<()> {
        sqlx::query("INSERT INTO attention_log (id, ts, focus, reason) VALUES (?, ?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(shift.at.to_rfc3339())
            .bind(&shift.focus)
            .bind(&shift.reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

//! SQLite implementation of the AlertRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Alert, AlertSeverity};
use crate::domain::ports::AlertRepository;

const ALERT_COLUMNS: &str = "id, kind, severity, message, details, first_seen_at, last_seen_at, occurrence_count";

#[derive(Clone)]
pub struct SqliteAlertRepository {
    pool: SqlitePool,
}

impl SqliteAlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for SqliteAlertRepository {
    async fn upsert(
        &self,
        kind: &str,
        severity: AlertSeverity,
        message: &str,
        details: serde_json::Value,
    ) -> DomainResult<(Alert, bool)> {
        // A plain SELECT-then-branch would race two concurrent first-raises
        // of the same (kind, severity) into a UNIQUE-constraint failure;
        // the upsert is done as a single statement instead.
        let candidate = Alert::new(kind, severity, message, details.clone());

        let row: AlertRow = sqlx::query_as(&format!(
            r#"INSERT INTO alerts
               (id, kind, severity, message, details, first_seen_at, last_seen_at, occurrence_count)
               VALUES (?, ?, ?, ?, ?, ?, ?, 1)
               ON CONFLICT (kind, severity) DO UPDATE SET
                   message = excluded.message,
                   details = excluded.details,
                   last_seen_at = excluded.last_seen_at,
                   occurrence_count = occurrence_count + 1
               RETURNING {ALERT_COLUMNS}"#
        ))
        .bind(candidate.id.to_string())
        .bind(kind)
        .bind(severity.as_str())
        .bind(message)
        .bind(details.to_string())
        .bind(candidate.first_seen_at.to_rfc3339())
        .bind(candidate.last_seen_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let inserted = row.occurrence_count == 1;
        let alert: Alert = row.try_into()?;

        sqlx::query("INSERT INTO alert_history (id, alert_id, seen_at) VALUES (?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(alert.id.to_string())
            .bind(alert.last_seen_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok((alert, inserted))
    }

    async fn get(&self, kind: &str, severity: AlertSeverity) -> DomainResult<Option<Alert>> {
        let row: Option<AlertRow> = sqlx::query_as(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE kind = ? AND severity = ?"
        ))
        .bind(kind)
        .bind(severity.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<Alert>> {
        let rows: Vec<AlertRow> = sqlx::query_as(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY last_seen_at DESC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: String,
    kind: String,
    severity: String,
    message: String,
    details: String,
    first_seen_at: String,
    last_seen_at: String,
    occurrence_count: i64,
}

impl TryFrom<AlertRow> for Alert {
    type Error = crate::domain::errors::DomainError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        use crate::domain::errors::DomainError;

        let id = super::parse_uuid(&row.id)?;
        let severity = AlertSeverity::from_str(&row.severity)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid severity: {}", row.severity)))?;
        let details: serde_json::Value = serde_json::from_str(&row.details)?;
        let first_seen_at = super::parse_datetime(&row.first_seen_at)?;
        let last_seen_at = super::parse_datetime(&row.last_seen_at)?;

        Ok(Alert {
            id,
            kind: row.kind,
            severity,
            message: row.message,
            details,
            first_seen_at,
            last_seen_at,
            occurrence_count: row.occurrence_count as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteAlertRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteAlertRepository::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_dedups() {
        let repo = setup_test_repo().await;

        let (first, inserted) = repo
            .upsert("slow_database", AlertSeverity::Warning, "db is slow", serde_json::json!({"ms": 3200}))
            .await
            .unwrap();
        assert!(inserted);
        assert_eq!(first.occurrence_count, 1);

        let (second, inserted) = repo
            .upsert("slow_database", AlertSeverity::Warning, "db is slow again", serde_json::json!({"ms": 4000}))
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(second.id, first.id);
        assert_eq!(second.occurrence_count, 2);
        assert_eq!(second.first_seen_at, first.first_seen_at);
    }

    #[tokio::test]
    async fn test_list_recent() {
        let repo = setup_test_repo().await;
        repo.upsert("high_cpu", AlertSeverity::Critical, "cpu pegged", serde_json::json!({}))
            .await
            .unwrap();

        let recent = repo.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}

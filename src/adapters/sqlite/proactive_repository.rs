//! SQLite implementation of the ProactiveRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Opportunity, Prediction};
use crate::domain::ports::ProactiveRepository;

#[derive(Clone)]
pub struct SqliteProactiveRepository {
    pool: SqlitePool,
}

impl SqliteProactiveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProactiveRepository for SqliteProactiveRepository {
    async fn record_opportunity(&self, opportunity: &Opportunity) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO opportunities (id, kind, subject_table, subject_id, details, created_at, expires_at, acted_upon) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(opportunity.id.to_string())
        .bind(&opportunity.kind)
        .bind(&opportunity.subject_table)
        .bind(opportunity.subject_id.to_string())
        .bind(opportunity.details.to_string())
        .bind(opportunity.created_at.to_rfc3339())
        .bind(opportunity.expires_at.to_rfc3339())
        .bind(opportunity.acted_upon)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_active_opportunities(&self) -> DomainResult<Vec<Opportunity>> {
        // `acted_upon IS NOT TRUE` rather than `acted_upon = 0` so a future
        // nullable acted_upon column wouldn't silently exclude open rows.
        let rows: Vec<OpportunityRow> = sqlx::query_as(
            "SELECT id, kind, subject_table, subject_id, details, created_at, expires_at, acted_upon \
             FROM opportunities WHERE acted_upon IS NOT TRUE AND expires_at > ? ORDER BY expires_at ASC",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_acted_upon(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("UPDATE opportunities SET acted_upon = TRUE WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_prediction(&self, prediction: &Prediction) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO predictions (id, kind, subject_table, subject_id, prediction, confidence, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(prediction.id.to_string())
        .bind(&prediction.kind)
        .bind(&prediction.subject_table)
        .bind(prediction.subject_id.to_string())
        .bind(prediction.prediction.to_string())
        .bind(prediction.confidence)
        .bind(prediction.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_predictions_for_subject(&self, subject_table: &str, subject_id: Uuid) -> DomainResult<Vec<Prediction>> {
        let rows: Vec<PredictionRow> = sqlx::query_as(
            "SELECT id, kind, subject_table, subject_id, prediction, confidence, created_at \
             FROM predictions WHERE subject_table = ? AND subject_id = ? ORDER BY created_at DESC",
        )
        .bind(subject_table)
        .bind(subject_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct OpportunityRow {
    id: String,
    kind: String,
    subject_table: String,
    subject_id: String,
    details: String,
    created_at: String,
    expires_at: String,
    acted_upon: bool,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = DomainError;

    fn try_from(row: OpportunityRow) -> Result<Self, Self::Error> {
        Ok(Opportunity {
            id: super::parse_uuid(&row.id)?,
            kind: row.kind,
            subject_table: row.subject_table,
            subject_id: super::parse_uuid(&row.subject_id)?,
            details: serde_json::from_str(&row.details)?,
            created_at: super::parse_datetime(&row.created_at)?,
            expires_at: super::parse_datetime(&row.expires_at)?,
            acted_upon: row.acted_upon,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PredictionRow {
    id: String,
    kind: String,
    subject_table: String,
    subject_id: String,
    prediction: String,
    confidence: f32,
    created_at: String,
}

impl TryFrom<PredictionRow> for Prediction {
    type Error = DomainError;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        Ok(Prediction {
            id: super::parse_uuid(&row.id)?,
            kind: row.kind,
            subject_table: row.subject_table,
            subject_id: super::parse_uuid(&row.subject_id)?,
            prediction: serde_json::from_str(&row.prediction)?,
            confidence: row.confidence,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::Duration;

    #[tokio::test]
    async fn test_record_and_list_active_opportunities() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProactiveRepository::new(pool);
        let subject = Uuid::new_v4();
        let opp = Opportunity::new("deadline_risk", "goals", subject, serde_json::json!({"days_left": 1}), Duration::days(1));
        repo.record_opportunity(&opp).await.unwrap();

        let active = repo.list_active_opportunities().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].subject_id, subject);
    }

    #[tokio::test]
    async fn test_mark_acted_upon_excludes_from_active_list() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProactiveRepository::new(pool);
        let opp = Opportunity::new("deadline_risk", "goals", Uuid::new_v4(), serde_json::json!({}), Duration::days(1));
        repo.record_opportunity(&opp).await.unwrap();
        repo.mark_acted_upon(opp.id).await.unwrap();

        let active = repo.list_active_opportunities().await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_expired_opportunity_excluded_from_active_list() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProactiveRepository::new(pool);
        let opp = Opportunity::new("deadline_risk", "goals", Uuid::new_v4(), serde_json::json!({}), Duration::seconds(-5));
        repo.record_opportunity(&opp).await.unwrap();

        let active = repo.list_active_opportunities().await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_record_and_list_predictions_for_subject() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteProactiveRepository::new(pool);
        let subject = Uuid::new_v4();
        let pred = Prediction::new("deadline_miss", "goals", subject, serde_json::json!({"eta_days": 3}), 0.7);
        repo.record_prediction(&pred).await.unwrap();

        let found = repo.list_predictions_for_subject("goals", subject).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.7);
    }
}

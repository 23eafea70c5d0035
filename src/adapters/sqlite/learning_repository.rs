//! SQLite implementation of the LearningRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Outcome, Pattern, PatternCategory};
use crate::domain::ports::LearningRepository;

#[derive(Clone)]
pub struct SqliteLearningRepository {
    pool: SqlitePool,
}

impl SqliteLearningRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LearningRepository for SqliteLearningRepository {
    async fn record_outcome(&self, outcome: &Outcome) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO learning_outcomes
               (id, decision_id, action_type, expected, actual, success, feedback_score, context, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(outcome.id.to_string())
        .bind(outcome.decision_id.map(|id| id.to_string()))
        .bind(&outcome.action_type)
        .bind(outcome.expected.to_string())
        .bind(outcome.actual.to_string())
        .bind(outcome.success)
        .bind(outcome.feedback_score)
        .bind(outcome.context.to_string())
        .bind(outcome.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_outcomes_since(
        &self,
        action_type: Option<&str>,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Outcome>> {
        let rows: Vec<OutcomeRow> = match action_type {
            Some(action_type) => {
                sqlx::query_as(
                    "SELECT id, decision_id, action_type, expected, actual, success, feedback_score, context, created_at \
                     FROM learning_outcomes WHERE action_type = ? AND created_at >= ? ORDER BY created_at ASC",
                )
                .bind(action_type)
                .bind(since.to_rfc3339())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, decision_id, action_type, expected, actual, success, feedback_score, context, created_at \
                     FROM learning_outcomes WHERE created_at >= ? ORDER BY created_at ASC",
                )
                .bind(since.to_rfc3339())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_pattern(&self, pattern: &Pattern) -> DomainResult<()> {
        let existing: Option<PatternRow> = sqlx::query_as(
            "SELECT id, category, conditions, confidence, occurrence_count, last_seen \
             FROM learned_patterns WHERE category = ? AND conditions = ?",
        )
        .bind(pattern.category.as_str())
        .bind(pattern.conditions.to_string())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            sqlx::query("UPDATE learned_patterns SET occurrence_count = occurrence_count + 1, last_seen = ?, confidence = ? WHERE id = ?")
                .bind(pattern.last_seen.to_rfc3339())
                .bind(pattern.confidence)
                .bind(&row.id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query(
                "INSERT INTO learned_patterns (id, category, conditions, confidence, occurrence_count, last_seen) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(pattern.id.to_string())
            .bind(pattern.category.as_str())
            .bind(pattern.conditions.to_string())
            .bind(pattern.confidence)
            .bind(pattern.occurrence_count as i64)
            .bind(pattern.last_seen.to_rfc3339())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn list_patterns(&self, category: Option<PatternCategory>) -> DomainResult<Vec<Pattern>> {
        let rows: Vec<PatternRow> = match category {
            Some(category) => {
                sqlx::query_as("SELECT id, category, conditions, confidence, occurrence_count, last_seen FROM learned_patterns WHERE category = ?")
                    .bind(category.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT id, category, conditions, confidence, occurrence_count, last_seen FROM learned_patterns")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct OutcomeRow {
    id: String,
    decision_id: Option<String>,
    action_type: String,
    expected: String,
    actual: String,
    success: bool,
    feedback_score: f32,
    context: String,
    created_at: String,
}

impl TryFrom<OutcomeRow> for Outcome {
    type Error = DomainError;

    fn try_from(row: OutcomeRow) -> Result<Self, Self::Error> {
        Ok(Outcome {
            id: super::parse_uuid(&row.id)?,
            decision_id: super::parse_optional_uuid(row.decision_id)?,
            action_type: row.action_type,
            expected: serde_json::from_str(&row.expected)?,
            actual: serde_json::from_str(&row.actual)?,
            success: row.success,
            feedback_score: row.feedback_score,
            context: serde_json::from_str(&row.context)?,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    id: String,
    category: String,
    conditions: String,
    confidence: f32,
    occurrence_count: i64,
    last_seen: String,
}

impl TryFrom<PatternRow> for Pattern {
    type Error = DomainError;

    fn try_from(row: PatternRow) -> Result<Self, Self::Error> {
        let category = PatternCategory::from_str(&row.category)
            .ok_or_else(|| DomainError::SerializationError(format!("invalid pattern category: {}", row.category)))?;
        Ok(Pattern {
            id: super::parse_uuid(&row.id)?,
            category,
            conditions: serde_json::from_str(&row.conditions)?,
            confidence: row.confidence,
            occurrence_count: row.occurrence_count as u64,
            last_seen: super::parse_datetime(&row.last_seen)?,
        })
    }
}

//! Opportunities and predictions surfaced by the proactive scanner.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A time-boxed suggestion that some entity warrants action, e.g. a goal
/// nearing its deadline with no recent progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub id: Uuid,
    pub kind: String,
    pub subject_table: String,
    pub subject_id: Uuid,
    pub details: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub acted_upon: bool,
}

impl Opportunity {
    pub fn new(kind: impl Into<String>, subject_table: impl Into<String>, subject_id: Uuid, details: Value, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            subject_table: subject_table.into(),
            subject_id,
            details,
            created_at,
            expires_at: created_at + ttl,
            acted_upon: false,
        }
    }

    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }
}

/// A forward-looking estimate about some entity, e.g. "this goal will miss
/// its deadline at the current progress rate".
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub id: Uuid,
    pub kind: String,
    pub subject_table: String,
    pub subject_id: Uuid,
    pub prediction: Value,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(kind: impl Into<String>, subject_table: impl Into<String>, subject_id: Uuid, prediction: Value, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            subject_table: subject_table.into(),
            subject_id,
            prediction,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }
}

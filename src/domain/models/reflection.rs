//! Records produced by the scheduler's periodic self-reflection.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// One reflection pass over the recent thought stream: what was observed,
/// what was inferred from it, and a one-line health judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub observations: Vec<Value>,
    pub insights: Vec<String>,
    pub self_assessment: String,
}

impl Reflection {
    pub fn new(topic: Option<String>, observations: Vec<Value>, insights: Vec<String>, self_assessment: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), created_at: Utc::now(), topic, observations, insights, self_assessment: self_assessment.into() }
    }
}

/// A single insight surfaced by a reflection pass, persisted separately so
/// it can be listed and browsed independent of the reflection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub id: Uuid,
    pub topic: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Insight {
    pub fn new(topic: Option<String>, content: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), topic, content: content.into(), created_at: Utc::now() }
    }
}

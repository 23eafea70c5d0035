//! Records produced by the self-optimization subsystem.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// One optimization pass: what changed and by how much.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRecord {
    pub id: Uuid,
    pub before: Value,
    pub after: Value,
    pub improvement: f32,
    pub created_at: DateTime<Utc>,
}

impl OptimizationRecord {
    pub fn new(before: Value, after: Value, improvement: f32) -> Self {
        Self { id: Uuid::new_v4(), before, after, improvement, created_at: Utc::now() }
    }
}

/// A self-healing action taken without operator involvement, e.g. a
/// provider reset or a cache eviction triggered by a memory breach.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfHealingEvent {
    pub id: Uuid,
    pub kind: String,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

impl SelfHealingEvent {
    pub fn new(kind: impl Into<String>, detail: Value) -> Self {
        Self { id: Uuid::new_v4(), kind: kind.into(), detail, created_at: Utc::now() }
    }
}

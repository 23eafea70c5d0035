//! A point-in-time capture of the scheduler's metacognitive state, taken
//! by the state-persistence loop so a restarted daemon has a trail of
//! what it was doing before it stopped.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub consciousness_state: String,
    pub attention_focus: Option<String>,
    pub pending_count: u64,
    pub metrics: Value,
}

impl StateSnapshot {
    pub fn new(consciousness_state: impl Into<String>, attention_focus: Option<String>, pending_count: u64, metrics: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            consciousness_state: consciousness_state.into(),
            attention_focus,
            pending_count,
            metrics,
        }
    }
}

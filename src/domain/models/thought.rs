//! Thought domain model.
//!
//! A thought is the unit of work drained by the metacognitive scheduler.
//! Thoughts are tagged by `kind` (which handler processes them) and
//! `priority` (which bucket of the scheduler's queue they sit in).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Closed set of thought kinds; determines scheduler routing.
///
/// `AlertRaised` is terminal: the scheduler acknowledges it without
/// dispatching to any handler, preventing an alert-raising handler from
/// re-triggering itself through its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtKind {
    Alert,
    MemoryRequest,
    GoalUpdate,
    LearningEvent,
    Prediction,
    ReasoningRequest,
    OptimizationRequest,
    External,
    /// Terminal: acknowledge-only, never re-dispatched.
    AlertRaised,
}

impl ThoughtKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::MemoryRequest => "memory_request",
            Self::GoalUpdate => "goal_update",
            Self::LearningEvent => "learning_event",
            Self::Prediction => "prediction",
            Self::ReasoningRequest => "reasoning_request",
            Self::OptimizationRequest => "optimization_request",
            Self::External => "external",
            Self::AlertRaised => "alert_raised",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "alert" => Some(Self::Alert),
            "memory_request" => Some(Self::MemoryRequest),
            "goal_update" => Some(Self::GoalUpdate),
            "learning_event" => Some(Self::LearningEvent),
            "prediction" => Some(Self::Prediction),
            "reasoning_request" => Some(Self::ReasoningRequest),
            "optimization_request" => Some(Self::OptimizationRequest),
            "external" => Some(Self::External),
            "alert_raised" => Some(Self::AlertRaised),
            _ => None,
        }
    }

    /// Thoughts of this kind must never be dispatched to a handler; the
    /// scheduler acknowledges them directly (feedback-loop guard).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AlertRaised)
    }
}

/// Scheduler priority bucket, ordered most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtPriority {
    Critical = 0,
    Urgent = 1,
    High = 2,
    Normal = 3,
    Low = 4,
    Maintenance = 5,
}

impl Default for ThoughtPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl ThoughtPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Maintenance => "maintenance",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "urgent" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }

    /// The bucket index into the scheduler's priority queue array, 0..=5.
    pub const fn bucket_index(&self) -> usize {
        *self as usize
    }
}

/// A unit of work in the metacognitive scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kind: ThoughtKind,
    pub payload: Value,
    /// Origin tag: an internal loop name, or `"external"`.
    pub source: String,
    pub priority: ThoughtPriority,
    pub processed: bool,
    /// Set iff `processed` is true.
    pub outcome: Option<Value>,
    /// Ids of thoughts this one causally spawned.
    #[serde(default)]
    pub linked: Vec<Uuid>,
}

impl Thought {
    pub fn new(
        kind: ThoughtKind,
        payload: Value,
        source: impl Into<String>,
        priority: ThoughtPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            kind,
            payload,
            source: source.into(),
            priority,
            processed: false,
            outcome: None,
            linked: Vec::new(),
        }
    }

    /// Mark this thought processed with the given outcome. Enforces the
    /// invariant that `outcome` is set iff `processed` is true.
    pub fn complete(&mut self, outcome: Value) {
        self.outcome = Some(outcome);
        self.processed = true;
    }

    /// Acknowledge a terminal thought (e.g. `alert_raised`) without routing
    /// it to any handler.
    pub fn acknowledge(&mut self) {
        self.complete(serde_json::json!({ "status": "acknowledged" }));
    }

    pub fn link(&mut self, thought_id: Uuid) {
        self.linked.push(thought_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_set_iff_processed() {
        let mut thought = Thought::new(
            ThoughtKind::External,
            serde_json::json!({}),
            "external",
            ThoughtPriority::Normal,
        );
        assert!(!thought.processed);
        assert!(thought.outcome.is_none());

        thought.complete(serde_json::json!({ "ok": true }));
        assert!(thought.processed);
        assert!(thought.outcome.is_some());
    }

    #[test]
    fn alert_raised_is_terminal() {
        assert!(ThoughtKind::AlertRaised.is_terminal());
        assert!(!ThoughtKind::Alert.is_terminal());
    }

    #[test]
    fn acknowledge_sets_status() {
        let mut thought = Thought::new(
            ThoughtKind::AlertRaised,
            serde_json::json!({}),
            "awareness",
            ThoughtPriority::Urgent,
        );
        thought.acknowledge();
        assert_eq!(
            thought.outcome.unwrap()["status"],
            serde_json::json!("acknowledged")
        );
    }

    #[test]
    fn priority_ordering_matches_bucket_index() {
        assert!(ThoughtPriority::Critical < ThoughtPriority::Urgent);
        assert!(ThoughtPriority::Urgent < ThoughtPriority::Low);
        assert_eq!(ThoughtPriority::Critical.bucket_index(), 0);
        assert_eq!(ThoughtPriority::Maintenance.bucket_index(), 5);
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ThoughtKind::Alert,
            ThoughtKind::MemoryRequest,
            ThoughtKind::GoalUpdate,
            ThoughtKind::LearningEvent,
            ThoughtKind::Prediction,
            ThoughtKind::ReasoningRequest,
            ThoughtKind::OptimizationRequest,
            ThoughtKind::External,
            ThoughtKind::AlertRaised,
        ] {
            assert_eq!(ThoughtKind::from_str(kind.as_str()), Some(kind));
        }
    }
}

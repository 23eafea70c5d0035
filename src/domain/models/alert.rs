//! Alert domain model.
//!
//! An alert is uniquely keyed by (kind, severity); re-raising within the
//! dedup window updates `last_seen_at`/`occurrence_count` rather than
//! inserting a duplicate row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Alert severity. Only `Warning`/`Critical` generate notifying thoughts;
/// `Info` is recorded only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Info-severity alerts are recorded but do not spawn a thought.
    pub fn notifies(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

/// A deduplicated alert record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    /// e.g. `slow_database`, `high_cpu`, `subsystem_unhealthy_<name>`
    pub kind: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub details: Value,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub occurrence_count: u64,
}

impl Alert {
    pub fn new(
        kind: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            severity,
            message: message.into(),
            details,
            first_seen_at: now,
            last_seen_at: now,
            occurrence_count: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_warning_and_critical_notify() {
        assert!(!AlertSeverity::Info.notifies());
        assert!(AlertSeverity::Warning.notifies());
        assert!(AlertSeverity::Critical.notifies());
    }
}

//! Learning handler: records outcomes, periodically extracts patterns by
//! clustering on `action_type`, and detects success-rate regressions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Outcome, Pattern, PatternCategory, Thought, ThoughtKind, ThoughtPriority};
use crate::domain::ports::LearningRepository;
use crate::services::handlers::SubsystemHandler;
use crate::services::scheduler::{ThoughtHandler, ThoughtSink};

/// Minimum sample size the regression detector requires before it will
/// compare two windows; below this, a rate swing is noise.
const MIN_REGRESSION_SAMPLES: usize = 10;
/// Drop in success rate, in percentage points, that counts as a regression.
const REGRESSION_THRESHOLD_PP: f64 = 10.0;

pub struct LearningHandler<R: LearningRepository> {
    repository: Arc<R>,
    sink: Arc<dyn ThoughtSink>,
}

impl<R: LearningRepository> LearningHandler<R> {
    pub fn new(repository: Arc<R>, sink: Arc<dyn ThoughtSink>) -> Self {
        Self { repository, sink }
    }

    #[instrument(skip(self, expected, actual, context))]
    pub async fn track_outcome(
        &self,
        action_type: &str,
        expected: Value,
        actual: Value,
        context: Value,
    ) -> DomainResult<Outcome> {
        let outcome = Outcome::observe(None, action_type, expected, actual, context);
        self.repository.record_outcome(&outcome).await?;
        Ok(outcome)
    }

    /// Cluster recent outcomes by `action_type` into successful/anomalous
    /// patterns. A cluster is anomalous if its failure rate exceeds 50%.
    #[instrument(skip(self))]
    pub async fn extract_patterns(&self) -> DomainResult<u64> {
        let recent = self.repository.list_outcomes_since(None, Utc::now() - ChronoDuration::days(1)).await?;

        let mut by_action: std::collections::HashMap<String, Vec<&Outcome>> = std::collections::HashMap::new();
        for outcome in &recent {
            by_action.entry(outcome.action_type.clone()).or_default().push(outcome);
        }

        let mut extracted = 0u64;
        for (action_type, outcomes) in by_action {
            let total = outcomes.len() as f32;
            let successes = outcomes.iter().filter(|o| o.success).count() as f32;
            let success_rate = successes / total;
            let category = if success_rate >= 0.5 { PatternCategory::Successful } else { PatternCategory::Anomalous };

            let pattern = Pattern::new(category, serde_json::json!({ "action_type": action_type }), success_rate);
            self.repository.upsert_pattern(&pattern).await?;
            extracted += 1;
        }

        Ok(extracted)
    }

    /// Compare the last hour's success rate to the prior 24 hours'; emits
    /// a `performance_regression` learning thought if it dropped more than
    /// [`REGRESSION_THRESHOLD_PP`] percentage points on at least
    /// [`MIN_REGRESSION_SAMPLES`] samples.
    #[instrument(skip(self))]
    pub async fn detect_regression(&self) -> DomainResult<bool> {
        let recent = self.repository.list_outcomes_since(None, Utc::now() - ChronoDuration::hours(1)).await?;
        let prior = self.repository.list_outcomes_since(None, Utc::now() - ChronoDuration::hours(25)).await?;
        let prior: Vec<&Outcome> = prior.iter().filter(|o| o.created_at < Utc::now() - ChronoDuration::hours(1)).collect();

        if recent.len() < MIN_REGRESSION_SAMPLES || prior.len() < MIN_REGRESSION_SAMPLES {
            return Ok(false);
        }

        let recent_rate = success_rate(recent.iter());
        let prior_rate = success_rate(prior.into_iter());
        let drop_pp = (prior_rate - recent_rate) * 100.0;

        if drop_pp > REGRESSION_THRESHOLD_PP {
            warn!(drop_pp, recent_rate, prior_rate, "performance regression detected");
            self.sink
                .emit_thought(
                    serde_json::json!({ "reason": "performance_regression", "drop_pp": drop_pp, "recent_rate": recent_rate, "prior_rate": prior_rate }),
                    ThoughtKind::LearningEvent,
                    ThoughtPriority::High,
                )
                .await?;
            return Ok(true);
        }
        Ok(false)
    }
}

fn success_rate<'a>(outcomes: impl Iterator<Item = &'a Outcome>) -> f64 {
    let mut total = 0usize;
    let mut successes = 0usize;
    for outcome in outcomes {
        total += 1;
        if outcome.success {
            successes += 1;
        }
    }
    if total == 0 {
        1.0
    } else {
        successes as f64 / total as f64
    }
}

#[async_trait]
impl<R: LearningRepository> ThoughtHandler for LearningHandler<R> {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        let action_type = thought
            .payload
            .get("action_type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DomainError::ValidationFailed("learning event missing action_type".to_string()))?;
        let expected = thought.payload.get("expected").cloned().unwrap_or(Value::Null);
        let actual = thought.payload.get("actual").cloned().unwrap_or(Value::Null);
        let context = thought.payload.get("context").cloned().unwrap_or(Value::Null);

        let outcome = self.track_outcome(action_type, expected, actual, context).await?;
        info!(outcome_id = %outcome.id, success = outcome.success, "learning outcome recorded");
        Ok(serde_json::json!({ "outcome_id": outcome.id, "success": outcome.success }))
    }
}

#[async_trait]
impl<R: LearningRepository> SubsystemHandler for LearningHandler<R> {
    fn name(&self) -> &'static str {
        "learning"
    }

    async fn health(&self) -> DomainResult<Value> {
        let recent = self.repository.list_outcomes_since(None, Utc::now() - ChronoDuration::hours(1)).await?;
        Ok(serde_json::json!({ "status": "healthy", "score": 1.0, "details": { "recent_outcomes": recent.len() } }))
    }
}

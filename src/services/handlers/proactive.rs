//! Proactive handler: scans goals for deadline risk to surface
//! opportunities and predictions ahead of a `prediction` thought asking
//! for a read-out, and feeds active opportunities to the attention
//! manager as candidates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Goal, GoalStatus, Opportunity, Prediction, Thought};
use crate::domain::ports::{GoalFilter, GoalRepository, ProactiveRepository};
use crate::services::attention_manager::AttentionCandidate;
use crate::services::handlers::SubsystemHandler;
use crate::services::scheduler::ThoughtHandler;

/// Opportunity TTL: how long a surfaced deadline-risk opportunity stays
/// active before it's considered stale and excluded from scans.
const OPPORTUNITY_TTL_HOURS: i64 = 24;
/// A goal is "at risk" once less than this fraction of its remaining
/// time-to-deadline has elapsed relative to its remaining progress.
const RISK_PROGRESS_SLACK: f32 = 0.15;

pub struct ProactiveHandler<G: GoalRepository, P: ProactiveRepository> {
    goals: Arc<G>,
    repository: Arc<P>,
}

impl<G: GoalRepository, P: ProactiveRepository> ProactiveHandler<G, P> {
    pub fn new(goals: Arc<G>, repository: Arc<P>) -> Self {
        Self { goals, repository }
    }

    /// Scan in-flight goals with a deadline; a goal whose progress lags
    /// its elapsed time by more than [`RISK_PROGRESS_SLACK`] gets an
    /// opportunity (act on it) and a prediction (it will miss deadline at
    /// the current rate).
    pub async fn scan_goals(&self) -> DomainResult<u64> {
        let goals = self.goals.list(GoalFilter { status: Some(GoalStatus::InProgress), ..Default::default() }).await?;
        let mut raised = 0u64;
        for goal in goals {
            if let Some(risk) = deadline_risk(&goal) {
                let opportunity = Opportunity::new(
                    "deadline_risk",
                    "goals",
                    goal.id,
                    serde_json::json!({ "title": goal.title, "elapsed_fraction": risk.elapsed_fraction, "progress": goal.progress }),
                    Duration::hours(OPPORTUNITY_TTL_HOURS),
                );
                self.repository.record_opportunity(&opportunity).await?;

                let prediction = Prediction::new(
                    "deadline_miss",
                    "goals",
                    goal.id,
                    serde_json::json!({ "title": goal.title, "projected_completion_fraction": risk.projected_completion }),
                    risk.confidence,
                );
                self.repository.record_prediction(&prediction).await?;
                raised += 1;
            }
        }
        Ok(raised)
    }

    pub async fn active_opportunities(&self) -> DomainResult<Vec<Opportunity>> {
        self.repository.list_active_opportunities().await
    }

    /// Active opportunities expressed as candidates the attention manager
    /// can merge against goal priorities.
    pub async fn attention_candidates(&self) -> DomainResult<Vec<AttentionCandidate>> {
        let opportunities = self.active_opportunities().await?;
        Ok(opportunities
            .into_iter()
            .map(|opp| AttentionCandidate {
                description: format!("{}: {}", opp.kind, opp.subject_id),
                priority_rank: 1,
                urgency: 1.0,
                deadline: Some(opp.expires_at),
            })
            .collect())
    }
}

struct DeadlineRisk {
    elapsed_fraction: f32,
    projected_completion: f32,
    confidence: f32,
}

fn deadline_risk(goal: &Goal) -> Option<DeadlineRisk> {
    let deadline = goal.deadline?;
    let total = (deadline - goal.created_at).num_seconds() as f32;
    if total <= 0.0 {
        return None;
    }
    let elapsed = (Utc::now() - goal.created_at).num_seconds() as f32;
    let elapsed_fraction = (elapsed / total).clamp(0.0, 1.0);
    if elapsed_fraction - goal.progress < RISK_PROGRESS_SLACK {
        return None;
    }
    let projected_completion = if elapsed_fraction > 0.0 { goal.progress / elapsed_fraction } else { 0.0 };
    Some(DeadlineRisk { elapsed_fraction, projected_completion, confidence: elapsed_fraction })
}

#[async_trait]
impl<G: GoalRepository, P: ProactiveRepository> ThoughtHandler for ProactiveHandler<G, P> {
    async fn handle(&self, _thought: &Thought) -> DomainResult<Value> {
        let raised = self.scan_goals().await?;
        let active = self.active_opportunities().await?;
        Ok(serde_json::json!({ "raised": raised, "active_opportunities": active.len() }))
    }
}

#[async_trait]
impl<G: GoalRepository, P: ProactiveRepository> SubsystemHandler for ProactiveHandler<G, P> {
    fn name(&self) -> &'static str {
        "proactive"
    }

    async fn health(&self) -> DomainResult<Value> {
        let active = self.active_opportunities().await?;
        Ok(serde_json::json!({ "status": "healthy", "score": 1.0, "details": { "active_opportunities": active.len() } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository, SqliteProactiveRepository};
    use crate::domain::models::{GoalLevel, GoalPriority};

    async fn handler() -> ProactiveHandler<SqliteGoalRepository, SqliteProactiveRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let goals = Arc::new(SqliteGoalRepository::new(pool.clone()));
        let repository = Arc::new(SqliteProactiveRepository::new(pool));
        ProactiveHandler::new(goals, repository)
    }

    #[tokio::test]
    async fn test_scan_raises_opportunity_for_lagging_goal() {
        let handler = handler().await;
        let mut goal = Goal::new("ship it", "");
        goal.level = GoalLevel::Operational;
        goal.priority = GoalPriority::High;
        goal.status = GoalStatus::InProgress;
        goal.created_at = Utc::now() - Duration::hours(20);
        goal.deadline = Some(Utc::now() + Duration::hours(4));
        goal.progress = 0.1;
        handler.goals.create(&goal).await.unwrap();

        let raised = handler.scan_goals().await.unwrap();
        assert_eq!(raised, 1);

        let active = handler.active_opportunities().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].subject_id, goal.id);
    }

    #[tokio::test]
    async fn test_scan_skips_goal_on_track() {
        let handler = handler().await;
        let mut goal = Goal::new("ship it", "");
        goal.level = GoalLevel::Operational;
        goal.priority = GoalPriority::High;
        goal.status = GoalStatus::InProgress;
        goal.created_at = Utc::now() - Duration::hours(10);
        goal.deadline = Some(Utc::now() + Duration::hours(10));
        goal.progress = 0.6;
        handler.goals.create(&goal).await.unwrap();

        let raised = handler.scan_goals().await.unwrap();
        assert_eq!(raised, 0);
    }

    #[tokio::test]
    async fn test_scan_skips_goal_without_deadline() {
        let handler = handler().await;
        let mut goal = Goal::new("no deadline", "");
        goal.level = GoalLevel::Operational;
        goal.priority = GoalPriority::Low;
        goal.status = GoalStatus::InProgress;
        handler.goals.create(&goal).await.unwrap();

        let raised = handler.scan_goals().await.unwrap();
        assert_eq!(raised, 0);
    }

    #[tokio::test]
    async fn test_attention_candidates_reflect_active_opportunities() {
        let handler = handler().await;
        let mut goal = Goal::new("ship it", "");
        goal.level = GoalLevel::Operational;
        goal.priority = GoalPriority::High;
        goal.status = GoalStatus::InProgress;
        goal.created_at = Utc::now() - Duration::hours(20);
        goal.deadline = Some(Utc::now() + Duration::hours(4));
        goal.progress = 0.1;
        handler.goals.create(&goal).await.unwrap();
        handler.scan_goals().await.unwrap();

        let candidates = handler.attention_candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
    }
}

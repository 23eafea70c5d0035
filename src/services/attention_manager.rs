//! Priority attention manager.
//!
//! Computes a single "current focus" from the competing priority streams
//! (goals and proactively surfaced opportunities) and keeps a bounded,
//! durable history of focus shifts.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{AttentionConfig, Goal, GoalPriority};
use crate::domain::ports::GoalRepository;

/// Durable sink for attention-shift events. Implemented by the sqlite
/// adapter as an append-only log table.
#[async_trait]
pub trait AttentionLog: Send + Sync {
    async fn append(&self, shift: &AttentionShift) -> DomainResult<()>;
}

/// Narrow view of [`AttentionManager`] for callers that only need to
/// preempt/release a critical-alert hold, without the `GoalRepository`
/// bound that parameterizes the concrete manager. Lets the awareness
/// handler depend on this instead of `AttentionManager<R>` directly.
#[async_trait]
pub trait AttentionHold: Send + Sync {
    async fn preempt_for_alert(&self, alert_kind: &str) -> DomainResult<()>;
    async fn release_alert_hold(&self);
}

#[async_trait]
impl<R: GoalRepository> AttentionHold for AttentionManager<R> {
    async fn preempt_for_alert(&self, alert_kind: &str) -> DomainResult<()> {
        AttentionManager::preempt_for_alert(self, alert_kind).await
    }

    async fn release_alert_hold(&self) {
        AttentionManager::release_alert_hold(self).await
    }
}

/// One recorded change of focus.
#[derive(Debug, Clone)]
pub struct AttentionShift {
    pub at: DateTime<Utc>,
    pub focus: String,
    pub reason: String,
}

/// A competing claim on attention, ranked the same way a
/// [`crate::domain::models::Provider`] is: lower `priority_rank` wins.
#[derive(Debug, Clone)]
pub struct AttentionCandidate {
    pub description: String,
    pub priority_rank: u32,
    pub urgency: f32,
    pub deadline: Option<DateTime<Utc>>,
}

impl AttentionCandidate {
    fn from_goal(goal: &Goal) -> Self {
        Self {
            description: goal.title.clone(),
            priority_rank: goal_priority_rank(goal.priority),
            urgency: if goal.deadline.is_some() { 0.5 } else { 0.0 },
            deadline: goal.deadline,
        }
    }
}

/// Maps [`GoalPriority`] onto the rank scale used across the runtime, where
/// rank 0 is the most urgent and matches "critical".
fn goal_priority_rank(priority: GoalPriority) -> u32 {
    match priority {
        GoalPriority::Critical => 0,
        GoalPriority::High => 1,
        GoalPriority::Medium => 2,
        GoalPriority::Low => 3,
    }
}

struct AttentionState {
    current_focus: Option<String>,
    history: VecDeque<AttentionShift>,
    attention_shifts: u64,
    critical_hold: Option<String>,
}

/// Owns the runtime's single notion of "what am I focused on right now".
pub struct AttentionManager<R: GoalRepository> {
    goals: Arc<R>,
    log: Arc<dyn AttentionLog>,
    config: AttentionConfig,
    state: RwLock<AttentionState>,
}

impl<R: GoalRepository> AttentionManager<R> {
    pub fn new(goals: Arc<R>, log: Arc<dyn AttentionLog>, config: AttentionConfig) -> Self {
        Self {
            goals,
            log,
            config,
            state: RwLock::new(AttentionState {
                current_focus: None,
                history: VecDeque::new(),
                attention_shifts: 0,
                critical_hold: None,
            }),
        }
    }

    /// Recompute focus from the top goals plus any proactively surfaced
    /// candidates (e.g. prediction-derived opportunities from the
    /// proactive handler). Call on the manager's ~1s tick.
    #[instrument(skip(self, proactive))]
    pub async fn tick(&self, proactive: Vec<AttentionCandidate>) -> DomainResult<Option<String>> {
        let top_goals = self.goals.get_top_by_priority(self.config.top_goals).await?;
        let mut candidates: Vec<AttentionCandidate> =
            top_goals.iter().map(AttentionCandidate::from_goal).collect();
        candidates.extend(proactive);

        candidates.sort_by(|a, b| {
            a.priority_rank
                .cmp(&b.priority_rank)
                .then(b.urgency.partial_cmp(&a.urgency).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| match (a.deadline, b.deadline) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });

        let top = match candidates.first() {
            Some(top) => top.clone(),
            None => return Ok(self.clear_if_unheld().await),
        };

        if top.priority_rank == 0 {
            self.shift_focus(top.description.clone(), "critical priority item".to_string()).await?;
            return Ok(Some(top.description));
        }

        // No critical item pending; release a hold if nothing urgent
        // remains so focus can clear naturally.
        let has_urgent = candidates.iter().any(|c| c.priority_rank <= 1);
        if !has_urgent {
            return Ok(self.clear_if_unheld().await);
        }

        let state = self.state.read().await;
        Ok(state.current_focus.clone())
    }

    /// A critical alert preempts whatever the manager was tracking,
    /// forcing focus onto the alert until it is acknowledged.
    #[instrument(skip(self))]
    pub async fn preempt_for_alert(&self, alert_kind: &str) -> DomainResult<()> {
        let focus = format!("CRITICAL: {alert_kind}");
        let mut state = self.state.write().await;
        state.critical_hold = Some(focus.clone());
        drop(state);
        self.shift_focus(focus, "critical alert raised".to_string()).await
    }

    /// Release a critical-alert hold once the alert has been acknowledged.
    pub async fn release_alert_hold(&self) {
        let mut state = self.state.write().await;
        state.critical_hold = None;
    }

    async fn shift_focus(&self, focus: String, reason: String) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.current_focus.as_deref() == Some(focus.as_str()) {
            return Ok(());
        }

        let shift = AttentionShift { at: Utc::now(), focus: focus.clone(), reason };
        state.current_focus = Some(focus.clone());
        state.attention_shifts += 1;
        state.history.push_back(shift.clone());
        while state.history.len() > self.config.history_capacity {
            state.history.pop_front();
        }
        drop(state);

        info!(focus = %focus, "attention focus shifted");
        self.log.append(&shift).await
    }

    async fn clear_if_unheld(&self) -> Option<String> {
        let mut state = self.state.write().await;
        if state.critical_hold.is_some() {
            return state.current_focus.clone();
        }
        state.current_focus = None;
        None
    }

    pub async fn current_focus(&self) -> Option<String> {
        self.state.read().await.current_focus.clone()
    }

    pub async fn history(&self) -> Vec<AttentionShift> {
        self.state.read().await.history.iter().cloned().collect()
    }

    pub async fn shift_count(&self) -> u64 {
        self.state.read().await.attention_shifts
    }
}

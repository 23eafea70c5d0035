//! Goal domain model.
//!
//! Goals are hierarchical, progress-tracked objectives. A goal's progress is
//! the arithmetic mean of its children's progress; a goal may only enter
//! `in_progress` once every dependency it names has completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a goal in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Created, not yet scheduled for work
    Pending,
    /// Being actively worked but not yet making measured progress
    Active,
    /// Making measured progress
    InProgress,
    /// Waiting on an unresolved dependency
    Blocked,
    /// Terminal: reached 100% progress
    Completed,
    /// Terminal: abandoned due to failure
    Failed,
    /// Terminal: abandoned by operator choice
    Cancelled,
}

impl Default for GoalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "in_progress" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if this is a terminal state: completed, failed, or cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if this status can transition to another status.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, new_status),
            (Self::Pending, Self::Active)
                | (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Blocked)
                | (Self::Pending, Self::Cancelled)
                | (Self::Active, Self::InProgress)
                | (Self::Active, Self::Blocked)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Failed)
                | (Self::Active, Self::Cancelled)
                | (Self::InProgress, Self::Blocked)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::InProgress, Self::Cancelled)
                | (Self::Blocked, Self::Active)
                | (Self::Blocked, Self::InProgress)
                | (Self::Blocked, Self::Cancelled)
        )
    }
}

/// Priority level for goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Default for GoalPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl GoalPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Level of a goal in the strategic/tactical/operational hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalLevel {
    Strategic,
    Tactical,
    Operational,
}

impl Default for GoalLevel {
    fn default() -> Self {
        Self::Operational
    }
}

impl GoalLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategic => "strategic",
            Self::Tactical => "tactical",
            Self::Operational => "operational",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strategic" => Some(Self::Strategic),
            "tactical" => Some(Self::Tactical),
            "operational" => Some(Self::Operational),
            _ => None,
        }
    }
}

/// A hierarchical, progress-tracked objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub level: GoalLevel,
    pub priority: GoalPriority,
    pub status: GoalStatus,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub children: Vec<Uuid>,
    /// Fraction complete in [0, 1]. For a non-leaf goal this is the mean of
    /// `children`'s progress and should not be set directly; see
    /// [`Goal::recompute_progress_from_children`].
    pub progress: f32,
    pub deadline: Option<DateTime<Utc>>,
    /// Goal ids that must be `Completed` before this goal may enter
    /// `InProgress`.
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Goal {
    /// Create a new goal with the given title and description.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            level: GoalLevel::default(),
            priority: GoalPriority::default(),
            status: GoalStatus::default(),
            parent_id: None,
            children: Vec::new(),
            progress: 0.0,
            deadline: None,
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn with_level(mut self, level: GoalLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_priority(mut self, priority: GoalPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_dependency(mut self, goal_id: Uuid) -> Self {
        self.dependencies.push(goal_id);
        self
    }

    /// Returns true if every dependency id is present in `completed_ids`.
    pub fn dependencies_satisfied(&self, completed_ids: &[Uuid]) -> bool {
        self.dependencies
            .iter()
            .all(|dep| completed_ids.contains(dep))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn can_transition_to(&self, new_status: GoalStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to a new status, enforcing the dependency gate on entry
    /// to `InProgress` and clamping progress to 1.0 on entry to `Completed`.
    pub fn transition_to(
        &mut self,
        new_status: GoalStatus,
        completed_dependency_ids: &[Uuid],
    ) -> Result<(), String> {
        if !self.can_transition_to(new_status) {
            return Err(format!(
                "cannot transition from {} to {}",
                self.status.as_str(),
                new_status.as_str()
            ));
        }
        if new_status == GoalStatus::InProgress
            && !self.dependencies_satisfied(completed_dependency_ids)
        {
            return Err("goal has unresolved dependencies".to_string());
        }
        self.status = new_status;
        if new_status == GoalStatus::Completed {
            self.progress = 1.0;
        }
        self.updated_at = Utc::now();
        self.version += 1;
        Ok(())
    }

    /// Recompute this goal's `progress` as the arithmetic mean of its
    /// children's progress. No-op for a leaf goal (empty `children`).
    pub fn recompute_progress_from_children(&mut self, children_progress: &[f32]) {
        if children_progress.is_empty() {
            return;
        }
        let sum: f32 = children_progress.iter().sum();
        self.progress = (sum / children_progress.len() as f32).clamp(0.0, 1.0);
        self.updated_at = Utc::now();
        self.version += 1;
    }

    /// Set this goal's own progress directly (leaf goals only; callers are
    /// responsible for not calling this on a goal with children).
    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress.clamp(0.0, 1.0);
        self.updated_at = Utc::now();
        self.version += 1;
    }

    pub fn add_child(&mut self, child_id: Uuid) {
        if !self.children.contains(&child_id) {
            self.children.push(child_id);
            self.updated_at = Utc::now();
            self.version += 1;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.is_empty() {
            return Err("goal title cannot be empty".to_string());
        }
        if self.title.len() > 255 {
            return Err("goal title cannot exceed 255 characters".to_string());
        }
        if !(0.0..=1.0).contains(&self.progress) {
            return Err("goal progress must be in [0, 1]".to_string());
        }
        if self.dependencies.contains(&self.id) {
            return Err("goal cannot depend on itself".to_string());
        }
        Ok(())
    }
}

/// Builder for creating goals with a fluent API.
#[derive(Debug, Default)]
pub struct GoalBuilder {
    title: Option<String>,
    description: Option<String>,
    level: GoalLevel,
    priority: GoalPriority,
    parent_id: Option<Uuid>,
    deadline: Option<DateTime<Utc>>,
    dependencies: Vec<Uuid>,
}

impl GoalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn level(mut self, level: GoalLevel) -> Self {
        self.level = level;
        self
    }

    pub fn priority(mut self, priority: GoalPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn dependency(mut self, goal_id: Uuid) -> Self {
        self.dependencies.push(goal_id);
        self
    }

    pub fn build(self) -> Result<Goal, String> {
        let title = self.title.ok_or("goal title is required")?;
        let description = self.description.unwrap_or_default();

        let mut goal = Goal::new(title, description)
            .with_level(self.level)
            .with_priority(self.priority);

        if let Some(parent_id) = self.parent_id {
            goal = goal.with_parent(parent_id);
        }
        if let Some(deadline) = self.deadline {
            goal = goal.with_deadline(deadline);
        }
        for dep in self.dependencies {
            goal = goal.with_dependency(dep);
        }

        goal.validate()?;
        Ok(goal)
    }
}

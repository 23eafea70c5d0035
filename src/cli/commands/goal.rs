//! Goal CLI commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_database, initialize_default_database, SqliteGoalRepository};
use crate::cli::display::{
    action_success, colorize_priority, colorize_status, label, list_table, output, render_list,
    section_header, short_id, truncate_ellipsis, CommandOutput,
};
use crate::domain::models::{GoalLevel, GoalPriority, GoalStatus};
use crate::domain::ports::GoalFilter;
use crate::services::GoalService;

#[derive(Subcommand, Debug)]
pub enum GoalCommands {
    /// Create a new goal
    Create {
        /// Goal title
        title: String,
        /// Goal description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Level (strategic, tactical, operational)
        #[arg(short, long, default_value = "operational")]
        level: String,
        /// Priority (low, medium, high, critical)
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Parent goal id
        #[arg(long)]
        parent: Option<Uuid>,
        /// Goal ids this goal depends on
        #[arg(long)]
        depends_on: Vec<Uuid>,
    },
    /// List goals
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,
    },
    /// Show goal details
    Show {
        /// Goal id
        id: Uuid,
    },
    /// Transition a goal's status
    Transition {
        /// Goal id
        id: Uuid,
        /// New status
        status: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct GoalOutput {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: String,
    pub priority: String,
    pub status: String,
    pub parent_id: Option<String>,
    pub progress: f32,
    pub dependencies: usize,
    pub created_at: String,
}

impl From<&crate::domain::models::Goal> for GoalOutput {
    fn from(goal: &crate::domain::models::Goal) -> Self {
        Self {
            id: goal.id.to_string(),
            title: goal.title.clone(),
            description: goal.description.clone(),
            level: goal.level.as_str().to_string(),
            priority: goal.priority.as_str().to_string(),
            status: goal.status.as_str().to_string(),
            parent_id: goal.parent_id.map(|id| id.to_string()),
            progress: goal.progress,
            dependencies: goal.dependencies.len(),
            created_at: goal.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalListOutput {
    pub goals: Vec<GoalOutput>,
    pub total: usize,
}

impl CommandOutput for GoalListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["ID", "Title", "Status", "Priority", "Progress"]);
        for goal in &self.goals {
            table.add_row(vec![
                short_id(&goal.id).to_string(),
                truncate_ellipsis(&goal.title, 30),
                colorize_status(&goal.status).to_string(),
                colorize_priority(&goal.priority).to_string(),
                format!("{:.0}%", goal.progress * 100.0),
            ]);
        }
        render_list("goal", table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CommandOutput for GoalOutput {
    fn to_human(&self) -> String {
        let mut out = format!("{}\n", section_header(&self.title).trim_start());
        out.push_str(&format!("{} {}\n", label("id"), self.id));
        out.push_str(&format!("{} {}\n", label("status"), colorize_status(&self.status)));
        out.push_str(&format!("{} {}\n", label("priority"), colorize_priority(&self.priority)));
        out.push_str(&format!("{} {}\n", label("level"), self.level));
        out.push_str(&format!("{} {:.0}%\n", label("progress"), self.progress * 100.0));
        if let Some(parent) = &self.parent_id {
            out.push_str(&format!("{} {parent}\n", label("parent")));
        }
        if !self.description.is_empty() {
            out.push_str(&format!("{} {}\n", label("description"), self.description));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(command: GoalCommands, database_url: Option<String>, json_mode: bool) -> Result<()> {
    let pool = match database_url {
        Some(url) => initialize_database(&url).await,
        None => initialize_default_database().await,
    }
    .context("failed to reach the cortex store")?;

    let repo = Arc::new(SqliteGoalRepository::new(pool));
    let service = GoalService::new(repo);

    match command {
        GoalCommands::Create { title, description, level, priority, parent, depends_on } => {
            let level = GoalLevel::from_str(&level).ok_or_else(|| anyhow::anyhow!("invalid level: {level}"))?;
            let priority =
                GoalPriority::from_str(&priority).ok_or_else(|| anyhow::anyhow!("invalid priority: {priority}"))?;

            let goal = service.create_goal(title, description, level, priority, parent, depends_on).await?;
            println!("{}", action_success(&format!("goal created: {}", goal.id)));
            if json_mode {
                output(&GoalOutput::from(&goal), json_mode);
            }
        }

        GoalCommands::List { status, priority } => {
            let filter = GoalFilter {
                status: status.as_deref().and_then(GoalStatus::from_str),
                priority: priority.as_deref().and_then(GoalPriority::from_str),
                parent_id: None,
            };
            let goals = service.list_goals(filter).await?;
            let out = GoalListOutput { total: goals.len(), goals: goals.iter().map(GoalOutput::from).collect() };
            output(&out, json_mode);
        }

        GoalCommands::Show { id } => {
            let goal = service.get_goal(id).await?.ok_or_else(|| anyhow::anyhow!("goal not found: {id}"))?;
            output(&GoalOutput::from(&goal), json_mode);
        }

        GoalCommands::Transition { id, status } => {
            let status = GoalStatus::from_str(&status).ok_or_else(|| anyhow::anyhow!("invalid status: {status}"))?;
            let goal = service.transition_status(id, status).await?;
            println!("{}", action_success(&format!("goal {} transitioned to {}", goal.id, status.as_str())));
        }
    }

    Ok(())
}

//! Health command: store connectivity and subsystem counts.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::sqlite::{
    initialize_database, initialize_default_database, SqliteAlertRepository, SqliteGoalRepository,
    SqliteMemoryRepository,
};
use crate::cli::display::{action_success, colorize_status, label, output, section_header, CommandOutput};
use crate::domain::models::{AlertSeverity, GoalStatus, MemoryType};
use crate::domain::ports::{AlertRepository, GoalFilter, GoalRepository, MemoryRepository};

#[derive(Debug, Serialize)]
pub struct HealthOutput {
    pub database_reachable: bool,
    pub goals_by_status: Vec<(String, u64)>,
    pub memories_by_type: Vec<(String, u64)>,
    pub recent_alerts: usize,
}

impl CommandOutput for HealthOutput {
    fn to_human(&self) -> String {
        let mut out = action_success("store reachable");

        out.push_str(&section_header("Goals"));
        if self.goals_by_status.is_empty() {
            out.push_str("\n  (none)");
        }
        for (status, count) in &self.goals_by_status {
            out.push_str(&format!("\n  {} {count}", colorize_status(status)));
        }

        out.push_str(&section_header("Memory"));
        if self.memories_by_type.is_empty() {
            out.push_str("\n  (none)");
        }
        for (memory_type, count) in &self.memories_by_type {
            out.push_str(&format!("\n  {} {count}", memory_type));
        }

        out.push_str(&section_header("Alerts"));
        out.push_str(&format!("\n  {} {}", label("recent"), self.recent_alerts));

        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(database_url: Option<String>, json_mode: bool) -> Result<()> {
    let pool = match database_url {
        Some(url) => initialize_database(&url).await,
        None => initialize_default_database().await,
    }
    .context("failed to reach the cortex store")?;

    let goal_repo = SqliteGoalRepository::new(pool.clone());
    let memory_repo = SqliteMemoryRepository::new(pool.clone());
    let alert_repo = SqliteAlertRepository::new(pool.clone());

    // Touch `list` once to surface a connectivity failure distinctly from
    // an empty store; the count queries below assume the pool is sound.
    goal_repo.list(GoalFilter::default()).await?;

    let goal_counts = goal_repo.count_by_status().await?;
    let memory_counts = memory_repo.count_by_type().await?;
    let alerts = alert_repo.list_recent(50).await?;

    let goals_by_status: Vec<(String, u64)> = [
        GoalStatus::Pending,
        GoalStatus::Active,
        GoalStatus::InProgress,
        GoalStatus::Blocked,
        GoalStatus::Completed,
        GoalStatus::Failed,
        GoalStatus::Cancelled,
    ]
    .into_iter()
    .filter_map(|status| goal_counts.get(&status).map(|&n| (status.as_str().to_string(), n)))
    .collect();

    let memories_by_type: Vec<(String, u64)> = [
        MemoryType::Episodic,
        MemoryType::Semantic,
        MemoryType::Procedural,
        MemoryType::Working,
        MemoryType::LongTerm,
    ]
    .into_iter()
    .filter_map(|memory_type| memory_counts.get(&memory_type).map(|&n| (memory_type.as_str().to_string(), n)))
    .collect();

    let critical_or_above = alerts
        .iter()
        .filter(|a| matches!(a.severity, AlertSeverity::Critical | AlertSeverity::Warning))
        .count();

    let result = HealthOutput {
        database_reachable: true,
        goals_by_status,
        memories_by_type,
        recent_alerts: critical_or_above,
    };
    output(&result, json_mode);

    Ok(())
}

//! Migrate command: the only command path that is allowed to issue DDL.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::sqlite::migrate_database;
use crate::cli::display::{action_success, label, output, CommandOutput};

const DEFAULT_DATABASE_URL: &str = "sqlite:.cortex/cortex.db";

#[derive(Debug, Serialize)]
pub struct MigrateOutput {
    pub applied: usize,
}

impl CommandOutput for MigrateOutput {
    fn to_human(&self) -> String {
        if self.applied == 0 {
            format!("{}", action_success("schema already up to date"))
        } else {
            format!("{}\n{} {}", action_success("migrations applied"), label("count"), self.applied)
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(database_url: Option<String>, json_mode: bool) -> Result<()> {
    let url = database_url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    let applied = migrate_database(&url).await.context("failed to apply migrations")?;
    output(&MigrateOutput { applied }, json_mode);
    Ok(())
}

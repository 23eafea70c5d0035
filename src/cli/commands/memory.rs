//! Memory CLI commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_database, initialize_default_database, SqliteMemoryRepository};
use crate::cli::display::{action_success, label, list_table, output, render_list, short_id, truncate_ellipsis, CommandOutput};
use crate::domain::models::MemoryType;
use crate::services::MemoryService;

#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// Store a new memory entry
    Remember {
        /// Memory content
        content: String,
        /// Memory type (episodic, semantic, procedural, working, long_term)
        #[arg(short = 't', long, default_value = "episodic")]
        memory_type: String,
        /// Importance in [0, 1]
        #[arg(short, long, default_value_t = 0.5)]
        importance: f32,
    },
    /// Recall a memory by id, bumping its access bookkeeping
    Recall {
        /// Memory id
        id: Uuid,
    },
    /// Full-text search over non-archived memory content
    Search {
        /// Search query
        query: String,
        /// Restrict to one memory type
        #[arg(short = 't', long)]
        memory_type: Option<String>,
        /// Maximum results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List non-archived memories of one type
    List {
        /// Memory type (episodic, semantic, procedural, working, long_term)
        #[arg(short = 't', long, default_value = "episodic")]
        memory_type: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct MemoryOutput {
    pub id: String,
    pub memory_type: String,
    pub content: String,
    pub importance: f32,
    pub access_count: u64,
    pub archived: bool,
    pub created_at: String,
}

impl From<&crate::domain::models::Memory> for MemoryOutput {
    fn from(memory: &crate::domain::models::Memory) -> Self {
        Self {
            id: memory.id.to_string(),
            memory_type: memory.memory_type.as_str().to_string(),
            content: memory.content.clone(),
            importance: memory.importance,
            access_count: memory.access_count,
            archived: memory.archived,
            created_at: memory.created_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for MemoryOutput {
    fn to_human(&self) -> String {
        format!(
            "{} {}\n{} {}\n{} {:.2}\n{} {}\n{} {}\n",
            label("id"),
            self.id,
            label("type"),
            self.memory_type,
            label("importance"),
            self.importance,
            label("accessed"),
            self.access_count,
            label("content"),
            self.content,
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct MemoryListOutput {
    pub memories: Vec<MemoryOutput>,
    pub total: usize,
}

impl CommandOutput for MemoryListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["ID", "Type", "Importance", "Content"]);
        for memory in &self.memories {
            table.add_row(vec![
                short_id(&memory.id).to_string(),
                memory.memory_type.clone(),
                format!("{:.2}", memory.importance),
                truncate_ellipsis(&memory.content, 50),
            ]);
        }
        render_list("memory", table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_memory_type(s: &str) -> Result<MemoryType> {
    MemoryType::from_str(s).ok_or_else(|| anyhow::anyhow!("invalid memory type: {s}"))
}

pub async fn execute(command: MemoryCommands, database_url: Option<String>, json_mode: bool) -> Result<()> {
    let pool = match database_url {
        Some(url) => initialize_database(&url).await,
        None => initialize_default_database().await,
    }
    .context("failed to reach the cortex store")?;

    let repo = Arc::new(SqliteMemoryRepository::new(pool));
    let service = MemoryService::new(repo);

    match command {
        MemoryCommands::Remember { content, memory_type, importance } => {
            let memory_type = parse_memory_type(&memory_type)?;
            let memory = service.remember(memory_type, content, importance).await?;
            println!("{}", action_success(&format!("memory stored: {}", memory.id)));
            if json_mode {
                output(&MemoryOutput::from(&memory), json_mode);
            }
        }

        MemoryCommands::Recall { id } => {
            let memory = service.recall(id).await?.ok_or_else(|| anyhow::anyhow!("memory not found: {id}"))?;
            output(&MemoryOutput::from(&memory), json_mode);
        }

        MemoryCommands::Search { query, memory_type, limit } => {
            let memory_type = memory_type.as_deref().map(parse_memory_type).transpose()?;
            // CLI search has no embedding driver wired (one-shot tools don't
            // carry one); it stays a pure FTS5 lookup, unlike the running
            // daemon's recall op which reranks by cosine similarity.
            let memories = service.search(&query, memory_type, limit, None).await?;
            let out =
                MemoryListOutput { total: memories.len(), memories: memories.iter().map(MemoryOutput::from).collect() };
            output(&out, json_mode);
        }

        MemoryCommands::List { memory_type } => {
            let memory_type = parse_memory_type(&memory_type)?;
            let memories = service.list_by_type(memory_type).await?;
            let out =
                MemoryListOutput { total: memories.len(), memories: memories.iter().map(MemoryOutput::from).collect() };
            output(&out, json_mode);
        }
    }

    Ok(())
}

//! CLI interface module
//!
//! One-shot administrative commands against the cortex store, independent
//! of the running daemon. These operate directly on repositories and
//! services for inspection and seeding; the daemon's scheduler is the only
//! writer during normal background operation.

pub mod commands;
pub mod display;

use clap::{Parser, Subcommand};

use commands::goal::GoalCommands;
use commands::memory::MemoryCommands;

#[derive(Parser, Debug)]
#[command(name = "cortex")]
#[command(about = "Cortex - AI orchestration runtime", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Database URL override (defaults to the configured store path)
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the cortex daemon: scheduler, handlers, and background loops
    Serve,

    /// Apply pending schema migrations. The only command that issues DDL.
    Migrate,

    /// Report store connectivity and subsystem counts
    Health,

    /// Goal management commands
    #[command(subcommand)]
    Goal(GoalCommands),

    /// Memory management commands
    #[command(subcommand)]
    Memory(MemoryCommands),
}

//! CLI command definitions and handlers
//!
//! Each submodule owns one clap subcommand enum plus its handler, operating
//! directly against the sqlite store rather than through a running daemon.

pub mod goal;
pub mod health;
pub mod memory;
pub mod migrate;

use clap::Parser;
use cortex_runtime::cli::commands::goal::GoalCommands;
use cortex_runtime::cli::commands::memory::MemoryCommands;
use cortex_runtime::cli::{Cli, Commands};

#[test]
fn test_parse_goal_create() {
    let cli = Cli::try_parse_from([
        "cortex",
        "goal",
        "create",
        "Ship the release",
        "--priority",
        "high",
        "--level",
        "tactical",
    ])
    .unwrap();

    match cli.command {
        Commands::Goal(GoalCommands::Create { title, priority, level, .. }) => {
            assert_eq!(title, "Ship the release");
            assert_eq!(priority, "high");
            assert_eq!(level, "tactical");
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn test_parse_goal_list_with_status_filter() {
    let cli = Cli::try_parse_from(["cortex", "goal", "list", "--status", "blocked"]).unwrap();

    match cli.command {
        Commands::Goal(GoalCommands::List { status, priority }) => {
            assert_eq!(status.as_deref(), Some("blocked"));
            assert!(priority.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn test_parse_memory_remember() {
    let cli = Cli::try_parse_from([
        "cortex",
        "memory",
        "remember",
        "the deploy window is Tuesdays",
        "--memory-type",
        "semantic",
        "--importance",
        "0.8",
    ])
    .unwrap();

    match cli.command {
        Commands::Memory(MemoryCommands::Remember { content, memory_type, importance }) => {
            assert_eq!(content, "the deploy window is Tuesdays");
            assert_eq!(memory_type, "semantic");
            assert!((importance - 0.8).abs() < f32::EPSILON);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn test_parse_health_requires_no_args() {
    let cli = Cli::try_parse_from(["cortex", "health"]).unwrap();
    assert!(matches!(cli.command, Commands::Health));
}

#[test]
fn test_json_flag_is_global() {
    let cli = Cli::try_parse_from(["cortex", "--json", "health"]).unwrap();
    assert!(cli.json);
}

use std::sync::Arc;

use cortex_runtime::adapters::sqlite::{create_migrated_test_pool, SqliteGoalRepository, SqliteMemoryRepository};
use cortex_runtime::domain::models::{GoalLevel, GoalPriority, GoalStatus, MemoryType};
use cortex_runtime::domain::ports::GoalFilter;
use cortex_runtime::services::{GoalService, MemoryService};

#[tokio::test]
async fn goal_lifecycle_through_the_service_layer() {
    let pool = create_migrated_test_pool().await.unwrap();
    let repo = Arc::new(SqliteGoalRepository::new(pool));
    let service = GoalService::new(repo);

    let goal = service
        .create_goal(
            "Reduce p99 latency".to_string(),
            "cut checkout p99 below 300ms".to_string(),
            GoalLevel::Tactical,
            GoalPriority::High,
            None,
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(goal.status, GoalStatus::Pending);

    let activated = service.transition_status(goal.id, GoalStatus::Active).await.unwrap();
    assert_eq!(activated.status, GoalStatus::Active);

    let listed = service.list_goals(GoalFilter { status: Some(GoalStatus::Active), ..Default::default() }).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, goal.id);
}

#[tokio::test]
async fn memory_working_set_is_evicted_over_bound() {
    let pool = create_migrated_test_pool().await.unwrap();
    let repo = Arc::new(SqliteMemoryRepository::new(pool));
    let service = MemoryService::new(repo).with_config(cortex_runtime::services::MemoryServiceConfig {
        working_memory_bound: 2,
        episodic_memory_bound: 2_000,
    });

    let first = service.remember(MemoryType::Working, "first".to_string(), 0.1).await.unwrap();
    service.remember(MemoryType::Working, "second".to_string(), 0.9).await.unwrap();
    service.remember(MemoryType::Working, "third".to_string(), 0.9).await.unwrap();

    // the least important entry should have been evicted to make room
    assert!(service.get(first.id).await.unwrap().is_none());

    let remaining = service.list_by_type(MemoryType::Working).await.unwrap();
    assert_eq!(remaining.len(), 2);
}

#[tokio::test]
async fn memory_search_finds_stored_content() {
    let pool = create_migrated_test_pool().await.unwrap();
    let repo = Arc::new(SqliteMemoryRepository::new(pool));
    let service = MemoryService::new(repo);

    service.remember(MemoryType::Semantic, "the gateway falls back across providers".to_string(), 0.6).await.unwrap();
    service.remember(MemoryType::Semantic, "unrelated content".to_string(), 0.6).await.unwrap();

    let hits = service.search("gateway", Some(MemoryType::Semantic), 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.contains("gateway"));
}

//! SQLite database adapters for the cortex runtime.

pub mod alert_repository;
pub mod attention_log;
pub mod connection;
pub mod goal_repository;
pub mod learning_repository;
pub mod memory_repository;
pub mod migrations;
pub mod neuron_repository;
pub mod optimization_repository;
pub mod proactive_repository;
pub mod reflection_repository;
pub mod state_snapshot_repository;
pub mod thought_repository;

pub use alert_repository::SqliteAlertRepository;
pub use attention_log::SqliteAttentionLog;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use goal_repository::SqliteGoalRepository;
pub use learning_repository::SqliteLearningRepository;
pub use memory_repository::SqliteMemoryRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use neuron_repository::SqliteNeuronRepository;
pub use optimization_repository::SqliteOptimizationRepository;
pub use proactive_repository::SqliteProactiveRepository;
pub use reflection_repository::SqliteReflectionRepository;
pub use state_snapshot_repository::SqliteStateSnapshotRepository;
pub use thought_repository::SqliteThoughtRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an optional UUID string from a SQLite row field.
pub fn parse_optional_uuid(s: Option<String>) -> DomainResult<Option<Uuid>> {
    s.map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse a JSON string from a SQLite row field, falling back to the type's default.
pub fn parse_json_or_default<T: serde::de::DeserializeOwned + Default>(s: Option<String>) -> DomainResult<T> {
    s.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|opt| opt.unwrap_or_default())
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
    #[error("schema is out of date: applied version {current}, latest known version {required}; run `cortex migrate`")]
    SchemaOutOfDate { current: i64, required: i64 },
}

/// Run pending embedded migrations against `database_url`. This is the
/// daemon's one and only DDL-issuing entry point; it is invoked from the
/// `migrate` CLI subcommand, never from `serve()`.
pub async fn migrate_database(database_url: &str) -> Result<usize, DatabaseError> {
    let pool = create_pool(database_url, None).await?;
    let migrator = Migrator::new(pool.clone());
    let applied = migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(applied)
}

/// Check that the schema applied at `pool` is at least as new as the
/// latest embedded migration, without issuing any DDL.
pub async fn verify_schema_current(pool: &SqlitePool) -> Result<(), DatabaseError> {
    let migrator = Migrator::new(pool.clone());
    let current = migrator.get_current_version().await?;
    let required = all_embedded_migrations().into_iter().map(|m| m.version).max().unwrap_or(0);
    if current < required {
        return Err(DatabaseError::SchemaOutOfDate { current, required });
    }
    Ok(())
}

/// Connect to `database_url` and verify the schema is current. Never
/// issues DDL; a stale schema is a startup error, not something the
/// daemon silently migrates.
pub async fn connect_database(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, None).await?;
    verify_connection(&pool).await?;
    verify_schema_current(&pool).await?;
    Ok(pool)
}

/// Connect and apply any pending migrations in one step. Intended for
/// one-shot CLI admin tools (`health`, `goal`, `memory`) run against a
/// local dev database, not for the daemon's own startup path.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, None).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

pub async fn initialize_default_database() -> Result<SqlitePool, DatabaseError> {
    initialize_database("sqlite:.cortex/cortex.db").await
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

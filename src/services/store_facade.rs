//! Resilient store facade: bounded-retry query execution plus a DDL
//! kill-switch so the running process can never alter schema objects.
//!
//! Migrations are a separate offline tool ([`crate::adapters::sqlite::migrations`]);
//! this facade is what every repository and handler should route raw SQL
//! through instead of calling `sqlx` directly.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{instrument, warn};

use crate::domain::error::DatabaseError;

fn ddl_prefix_regex() -> &'static Regex {
    static DDL_PREFIX: OnceLock<Regex> = OnceLock::new();
    DDL_PREFIX.get_or_init(|| Regex::new(r"(?i)^(create|alter|drop|grant|revoke|truncate)\b").expect("valid DDL regex"))
}

/// Strip leading whitespace and `--`/`/* */` comments before matching the
/// DDL keyword prefix, so a commented-out `SELECT` above a real `DROP`
/// can't hide it.
fn normalize(sql: &str) -> String {
    let mut s = sql.trim_start();
    loop {
        if let Some(rest) = s.strip_prefix("--") {
            s = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else if let Some(rest) = s.strip_prefix("/*") {
            s = rest.split_once("*/").map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else {
            break;
        }
    }
    s.to_string()
}

fn is_ddl(sql: &str) -> bool {
    ddl_prefix_regex().is_match(&normalize(sql))
}

/// Whether a `sqlx::Error` represents a transient condition worth retrying.
fn is_transient(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
    )
}

/// Policy governing whether runtime DDL is ever permitted.
#[derive(Debug, Clone)]
pub struct DdlPolicy {
    pub environment: String,
    pub runtime_ddl_enabled: bool,
}

impl DdlPolicy {
    pub fn is_locked(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "staging") || !self.runtime_ddl_enabled
    }
}

/// Wraps a [`SqlitePool`] with retry-with-backoff and the DDL kill-switch.
pub struct StoreFacade {
    pool: SqlitePool,
    policy: DdlPolicy,
    max_retries: u32,
}

impl StoreFacade {
    pub fn new(pool: SqlitePool, policy: DdlPolicy, max_retries: u32) -> Self {
        Self { pool, policy, max_retries }
    }

    fn guard_ddl(&self, sql: &str) -> Result<(), DatabaseError> {
        if is_ddl(sql) && self.policy.is_locked() {
            let prefix = normalize(sql).chars().take(32).collect();
            warn!(statement_prefix = %prefix, "runtime DDL blocked");
            return Err(DatabaseError::BlockedRuntimeDdl { statement_prefix: prefix });
        }
        Ok(())
    }

    /// Run `attempt` with bounded retry on transient sqlx errors. Blocked
    /// DDL and other non-transient errors surface immediately.
    async fn with_retry<T, F, Fut>(&self, attempt: F) -> Result<T, DatabaseError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let mut last_error = None;
        for n in 0..=self.max_retries {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !is_transient(&error) || n == self.max_retries {
                        return Err(map_sqlx_error(error));
                    }
                    let delay = Duration::from_millis(200 * (n as u64 + 1));
                    warn!(attempt = n, error = %error, delay_ms = delay.as_millis() as u64, "transient store error, retrying");
                    last_error = Some(error);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(map_sqlx_error(last_error.expect("loop always assigns on exhaustion")))
    }

    /// Execute a statement with no result rows (INSERT/UPDATE/DELETE).
    /// Refuses DDL per the kill-switch policy below.
    #[instrument(skip(self, sql))]
    pub async fn execute(&self, sql: &str) -> Result<u64, DatabaseError> {
        self.guard_ddl(sql)?;
        self.with_retry(|| async { sqlx::query(sql).execute(&self.pool).await.map(|r| r.rows_affected()) })
            .await
    }

    /// Run an explicit DDL statement, honoring the environment policy
    /// instead of unconditionally rejecting it. Intended only for the
    /// offline migration tool, never for request-serving code paths.
    #[instrument(skip(self, sql))]
    pub async fn execute_ddl_if_permitted(&self, sql: &str) -> Result<(), DatabaseError> {
        if !is_ddl(sql) {
            return Err(DatabaseError::QueryFailed("execute_ddl_if_permitted called with non-DDL statement".to_string()));
        }
        if self.policy.is_locked() {
            let prefix = normalize(sql).chars().take(32).collect();
            return Err(DatabaseError::BlockedRuntimeDdl { statement_prefix: prefix });
        }
        self.with_retry(|| async { sqlx::query(sql).execute(&self.pool).await.map(|_| ()) }).await
    }

    /// Fetch every row matching `sql`.
    #[instrument(skip(self, sql))]
    pub async fn fetch_rows(&self, sql: &str) -> Result<Vec<SqliteRow>, DatabaseError> {
        self.guard_ddl(sql)?;
        self.with_retry(|| async { sqlx::query(sql).fetch_all(&self.pool).await }).await
    }

    /// Fetch at most one row, returning `None` if there were none.
    #[instrument(skip(self, sql))]
    pub async fn fetch_one(&self, sql: &str) -> Result<Option<SqliteRow>, DatabaseError> {
        self.guard_ddl(sql)?;
        self.with_retry(|| async { sqlx::query(sql).fetch_optional(&self.pool).await }).await
    }

    /// Fetch a single `i64` scalar, e.g. from a `SELECT COUNT(*)`.
    #[instrument(skip(self, sql))]
    pub async fn fetch_scalar(&self, sql: &str) -> Result<Option<i64>, DatabaseError> {
        let row = self.fetch_one(sql).await?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_sqlx_error(error: sqlx::Error) -> DatabaseError {
    match error {
        sqlx::Error::RowNotFound => DatabaseError::QueryFailed("row not found".to_string()),
        other => DatabaseError::QueryFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    fn locked_policy() -> DdlPolicy {
        DdlPolicy { environment: "production".to_string(), runtime_ddl_enabled: false }
    }

    fn dev_policy() -> DdlPolicy {
        DdlPolicy { environment: "development".to_string(), runtime_ddl_enabled: true }
    }

    #[test]
    fn detects_ddl_case_insensitively_and_through_comments() {
        assert!(is_ddl("CREATE TABLE foo (id INTEGER)"));
        assert!(is_ddl("  -- comment\nDROP TABLE foo"));
        assert!(is_ddl("/* block */ alter table foo add column x"));
        assert!(!is_ddl("SELECT * FROM foo"));
        assert!(!is_ddl("insert into foo values (1)"));
    }

    #[test]
    fn ddl_policy_locks_production_and_staging_unconditionally() {
        let policy = DdlPolicy { environment: "production".to_string(), runtime_ddl_enabled: true };
        assert!(policy.is_locked());
        let policy = DdlPolicy { environment: "staging".to_string(), runtime_ddl_enabled: true };
        assert!(policy.is_locked());
    }

    #[test]
    fn ddl_policy_requires_opt_in_elsewhere() {
        assert!(dev_policy().clone().runtime_ddl_enabled);
        let disabled = DdlPolicy { environment: "development".to_string(), runtime_ddl_enabled: false };
        assert!(disabled.is_locked());
        assert!(!dev_policy().is_locked());
    }

    #[tokio::test]
    async fn execute_blocks_ddl_regardless_of_environment() {
        let pool = create_migrated_test_pool().await.unwrap();
        let facade = StoreFacade::new(pool, locked_policy(), 2);
        let result = facade.execute("CREATE TABLE evil (id INTEGER)").await;
        assert!(matches!(result, Err(DatabaseError::BlockedRuntimeDdl { .. })));
    }

    #[tokio::test]
    async fn execute_allows_ddl_when_policy_unlocked() {
        let pool = create_migrated_test_pool().await.unwrap();
        let facade = StoreFacade::new(pool, dev_policy(), 2);
        let result = facade.execute("CREATE TABLE scratch (id INTEGER)").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn execute_allows_dml() {
        let pool = create_migrated_test_pool().await.unwrap();
        let facade = StoreFacade::new(pool, locked_policy(), 2);
        let result = facade
            .execute("INSERT INTO goals (id, title, description, level, priority, status, progress, dependencies, created_at, updated_at) VALUES ('00000000-0000-0000-0000-000000000001','t','d','operational','medium','pending',0.0,'[]','2024-01-01T00:00:00Z','2024-01-01T00:00:00Z')")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn fetch_scalar_counts_rows() {
        let pool = create_migrated_test_pool().await.unwrap();
        let facade = StoreFacade::new(pool, dev_policy(), 2);
        let count = facade.fetch_scalar("SELECT COUNT(*) FROM goals").await.unwrap();
        assert_eq!(count, Some(0));
    }
}

//! Alert repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Alert, AlertSeverity};

/// Repository interface for Alert persistence.
///
/// `upsert` is the only write path: callers never insert a duplicate row
/// for an existing `(kind, severity)` pair, they call `upsert` and the
/// implementation decides whether to insert or update `occurrence_count`.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Insert a new alert, or update the existing one sharing
    /// `(kind, severity)` by bumping `last_seen_at` and `occurrence_count`.
    /// Returns the stored alert and whether this call inserted a new row.
    async fn upsert(
        &self,
        kind: &str,
        severity: AlertSeverity,
        message: &str,
        details: serde_json::Value,
    ) -> DomainResult<(Alert, bool)>;

    /// Look up an alert by its natural key.
    async fn get(&self, kind: &str, severity: AlertSeverity) -> DomainResult<Option<Alert>>;

    /// List all recorded alerts, most recently seen first.
    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<Alert>>;
}

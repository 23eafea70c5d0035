//! Thought stream repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Thought;

/// Durable persistence for the thought stream. The scheduler keeps its own
/// in-memory ring buffer for fast reads; this port is the append-only
/// durable log referenced by §5's backpressure policy.
#[async_trait]
pub trait ThoughtRepository: Send + Sync {
    /// Persist a thought (insert if new, update if already present —
    /// thoughts are mutated in place as they move from unprocessed to
    /// processed).
    async fn persist(&self, thought: &Thought) -> DomainResult<()>;

    /// Fetch a thought by id.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Thought>>;

    /// Fetch the most recently created thoughts, for `reflect()` and
    /// diagnostics.
    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<Thought>>;
}

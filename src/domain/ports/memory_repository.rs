//! Memory repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Memory, MemoryType};

/// Repository interface for Memory persistence.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Store a memory entry.
    async fn store(&self, memory: &Memory) -> DomainResult<()>;

    /// Get a memory by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Memory>>;

    /// Update an existing memory (access bookkeeping, reinforcement, archival).
    async fn update(&self, memory: &Memory) -> DomainResult<()>;

    /// Delete (forget) a memory by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Search non-archived memory content, optionally restricted to one
    /// type. Without `query_embedding`, ranks purely by full-text
    /// relevance; with one, widens the FTS candidate pool and re-ranks by
    /// cosine similarity against it.
    async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
        query_embedding: Option<&[f32]>,
    ) -> DomainResult<Vec<Memory>>;

    /// List non-archived memories of one type.
    async fn list_by_type(&self, memory_type: MemoryType) -> DomainResult<Vec<Memory>>;

    /// Count non-archived memories of one type, used to enforce the
    /// working-memory bound `W`.
    async fn count_active(&self, memory_type: MemoryType) -> DomainResult<u64>;

    /// List eviction candidates of one type ordered by
    /// `(importance ASC, last_accessed_at ASC)`, i.e. least important and
    /// least recently used first.
    async fn list_eviction_candidates(
        &self,
        memory_type: MemoryType,
        limit: usize,
    ) -> DomainResult<Vec<Memory>>;

    /// Count memories by type.
    async fn count_by_type(&self) -> DomainResult<std::collections::HashMap<MemoryType, u64>>;
}

//! Memory service: application logic over the unified memory repository.
//!
//! Owns the working-memory eviction bound: when the number of active
//! entries of a bounded type exceeds its configured capacity, the least
//! important and least recently used entries are evicted first.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Memory, MemoryType};
use crate::domain::ports::MemoryRepository;

/// Bounds enforced on in-memory working sets, by memory type.
#[derive(Debug, Clone)]
pub struct MemoryServiceConfig {
    /// Maximum active `Working` memories before eviction kicks in.
    pub working_memory_bound: usize,
    /// Maximum active `Episodic` memories before eviction kicks in.
    pub episodic_memory_bound: usize,
}

impl Default for MemoryServiceConfig {
    fn default() -> Self {
        Self {
            working_memory_bound: 100,
            episodic_memory_bound: 2_000,
        }
    }
}

/// Outcome of a maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub working_evicted: u64,
    pub episodic_evicted: u64,
}

pub struct MemoryService<R: MemoryRepository> {
    repository: Arc<R>,
    config: MemoryServiceConfig,
}

impl<R: MemoryRepository> MemoryService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            config: MemoryServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MemoryServiceConfig) -> Self {
        self.config = config;
        self
    }

    fn bound_for(&self, memory_type: MemoryType) -> Option<usize> {
        match memory_type {
            MemoryType::Working => Some(self.config.working_memory_bound),
            MemoryType::Episodic => Some(self.config.episodic_memory_bound),
            MemoryType::Semantic | MemoryType::Procedural | MemoryType::LongTerm => None,
        }
    }

    /// Store a new memory, evicting from the same type's working set first
    /// if storing it would exceed the configured bound.
    #[instrument(skip(self, content))]
    pub async fn remember(
        &self,
        memory_type: MemoryType,
        content: String,
        importance: f32,
    ) -> DomainResult<Memory> {
        let memory = Memory::new(memory_type, content, importance);
        memory.validate().map_err(DomainError::ValidationFailed)?;

        if self.bound_for(memory_type).is_some() {
            self.enforce_bound(memory_type).await?;
        }

        self.repository.store(&memory).await?;
        info!(memory_id = %memory.id, memory_type = memory_type.as_str(), "memory stored");
        Ok(memory)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Option<Memory>> {
        self.repository.get(id).await
    }

    /// Fetch a memory and record the access (bumps `access_count` and
    /// `last_accessed_at`, protecting it from the next eviction pass).
    #[instrument(skip(self))]
    pub async fn recall(&self, id: Uuid) -> DomainResult<Option<Memory>> {
        let memory = self.repository.get(id).await?;
        if let Some(mut memory) = memory {
            memory.record_access();
            self.repository.update(&memory).await?;
            Ok(Some(memory))
        } else {
            Ok(None)
        }
    }

    /// Raise a memory's importance after it proves useful, recording an
    /// access at the same time.
    #[instrument(skip(self))]
    pub async fn reinforce(&self, id: Uuid, delta: f32) -> DomainResult<Memory> {
        let mut memory = self
            .repository
            .get(id)
            .await?
            .ok_or(DomainError::MemoryNotFound(id))?;
        memory.reinforce(delta);
        self.repository.update(&memory).await?;
        Ok(memory)
    }

    #[instrument(skip(self))]
    pub async fn forget(&self, id: Uuid) -> DomainResult<()> {
        self.repository.delete(id).await?;
        info!(memory_id = %id, "memory forgotten");
        Ok(())
    }

    /// Attach an embedding to an already-stored memory (e.g. computed
    /// asynchronously by the memory handler's embedding driver after the
    /// initial `remember` call).
    #[instrument(skip(self, embedding))]
    pub async fn set_embedding(&self, id: Uuid, embedding: Vec<f32>) -> DomainResult<Memory> {
        let mut memory = self
            .repository
            .get(id)
            .await?
            .ok_or(DomainError::MemoryNotFound(id))?;
        memory.embedding = Some(embedding);
        self.repository.update(&memory).await?;
        Ok(memory)
    }

    pub async fn archive(&self, id: Uuid) -> DomainResult<Memory> {
        let mut memory = self
            .repository
            .get(id)
            .await?
            .ok_or(DomainError::MemoryNotFound(id))?;
        memory.archive();
        self.repository.update(&memory).await?;
        Ok(memory)
    }

    pub async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
        query_embedding: Option<&[f32]>,
    ) -> DomainResult<Vec<Memory>> {
        self.repository.search(query, memory_type, limit, query_embedding).await
    }

    pub async fn list_by_type(&self, memory_type: MemoryType) -> DomainResult<Vec<Memory>> {
        self.repository.list_by_type(memory_type).await
    }

    pub async fn stats(&self) -> DomainResult<HashMap<MemoryType, u64>> {
        self.repository.count_by_type().await
    }

    /// Evict least-important, least-recently-used entries of `memory_type`
    /// until the active count is one under the configured bound, making
    /// room for the entry about to be stored.
    async fn enforce_bound(&self, memory_type: MemoryType) -> DomainResult<u64> {
        let Some(bound) = self.bound_for(memory_type) else {
            return Ok(0);
        };

        let active = self.repository.count_active(memory_type).await?;
        if (active as usize) < bound {
            return Ok(0);
        }

        let overage = (active as usize) - bound + 1;
        let candidates = self
            .repository
            .list_eviction_candidates(memory_type, overage)
            .await?;

        let evicted = candidates.len() as u64;
        for candidate in candidates {
            self.repository.delete(candidate.id).await?;
        }

        if evicted > 0 {
            info!(
                memory_type = memory_type.as_str(),
                evicted, "evicted memories over bound"
            );
        }

        Ok(evicted)
    }

    /// Run a maintenance pass across every bounded memory type. Intended to
    /// be driven by the background loop supervisor on a fixed interval.
    #[instrument(skip(self))]
    pub async fn run_maintenance(&self) -> DomainResult<MaintenanceReport> {
        let working_evicted = self.enforce_bound(MemoryType::Working).await?;
        let episodic_evicted = self.enforce_bound(MemoryType::Episodic).await?;

        Ok(MaintenanceReport {
            working_evicted,
            episodic_evicted,
        })
    }
}

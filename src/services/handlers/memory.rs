//! Memory handler: wraps [`MemoryService`] for scheduler dispatch, adding
//! embedding generation with a deterministic fallback when no embedding
//! driver is configured.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{deterministic_hash_embedding, Memory, MemoryType, Thought};
use crate::domain::ports::MemoryRepository;
use crate::services::handlers::SubsystemHandler;
use crate::services::memory_service::MemoryService;
use crate::services::scheduler::ThoughtHandler;

/// Produces an embedding for newly stored content. A real deployment
/// backs this with a provider call; tests and offline runs use the
/// deterministic hash fallback.
#[async_trait]
pub trait EmbeddingDriver: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

pub struct HashFallbackEmbedding {
    pub dim: usize,
}

#[async_trait]
impl EmbeddingDriver for HashFallbackEmbedding {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        Some(deterministic_hash_embedding(text, self.dim))
    }
}

pub struct MemoryHandler<R: MemoryRepository> {
    service: MemoryService<R>,
    embeddings: Arc<dyn EmbeddingDriver>,
}

impl<R: MemoryRepository> MemoryHandler<R> {
    pub fn new(service: MemoryService<R>, embeddings: Arc<dyn EmbeddingDriver>) -> Self {
        Self { service, embeddings }
    }

    async fn embed_and_remember(&self, memory_type: MemoryType, content: String, importance: f32) -> DomainResult<Memory> {
        let memory = self.service.remember(memory_type, content, importance).await?;
        if let Some(embedding) = self.embeddings.embed(&memory.content).await {
            return self.service.set_embedding(memory.id, embedding).await;
        }
        Ok(memory)
    }
}

#[async_trait]
impl<R: MemoryRepository> ThoughtHandler for MemoryHandler<R> {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        let op = thought.payload.get("op").and_then(|v| v.as_str()).unwrap_or("remember");

        match op {
            "remember" => {
                let data = thought.payload.get("data").cloned().unwrap_or(Value::Null);
                let content = data.as_str().map(str::to_string).unwrap_or_else(|| data.to_string());
                let importance = thought.payload.get("importance").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
                let memory = self.embed_and_remember(MemoryType::Semantic, content, importance).await?;
                Ok(serde_json::json!({ "memory_id": memory.id }))
            }
            "recall" => {
                let query = thought.payload.get("query").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let limit = thought.payload.get("limit").and_then(|v| v.as_u64()).unwrap_or(10) as usize;
                let query_embedding = self.embeddings.embed(&query).await;
                let results = self.service.search(&query, None, limit, query_embedding.as_deref()).await?;
                Ok(serde_json::json!({ "results": results.iter().map(|m| serde_json::json!({
                    "id": m.id, "content": m.content, "importance": m.importance,
                })).collect::<Vec<_>>() }))
            }
            other => Err(DomainError::ValidationFailed(format!("unknown memory op {other}"))),
        }
    }
}

#[async_trait]
impl<R: MemoryRepository> SubsystemHandler for MemoryHandler<R> {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health(&self) -> DomainResult<Value> {
        let stats = self.service.stats().await?;
        Ok(serde_json::json!({ "status": "healthy", "score": 1.0, "details": { "counts_by_type": stats.iter().map(|(k, v)| (k.as_str().to_string(), *v)).collect::<std::collections::HashMap<_,_>>() } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteMemoryRepository};
    use crate::domain::models::ThoughtKind;
    use crate::domain::models::ThoughtPriority;

    async fn handler() -> MemoryHandler<SqliteMemoryRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteMemoryRepository::new(pool));
        let service = MemoryService::new(repo);
        MemoryHandler::new(service, Arc::new(HashFallbackEmbedding { dim: 16 }))
    }

    #[tokio::test]
    async fn test_remember_op_stores_and_returns_id() {
        let handler = handler().await;
        let thought = Thought::new(
            ThoughtKind::MemoryRequest,
            serde_json::json!({ "op": "remember", "data": "the sky is blue", "importance": 0.7 }),
            "test",
            ThoughtPriority::Normal,
        );
        let outcome = handler.handle(&thought).await.unwrap();
        assert!(outcome.get("memory_id").is_some());
    }

    #[tokio::test]
    async fn test_recall_op_finds_stored_memory() {
        let handler = handler().await;
        let remember = Thought::new(
            ThoughtKind::MemoryRequest,
            serde_json::json!({ "op": "remember", "data": "rust ownership rules", "importance": 0.5 }),
            "test",
            ThoughtPriority::Normal,
        );
        handler.handle(&remember).await.unwrap();

        let recall = Thought::new(
            ThoughtKind::MemoryRequest,
            serde_json::json!({ "op": "recall", "query": "ownership", "limit": 5 }),
            "test",
            ThoughtPriority::Normal,
        );
        let outcome = handler.handle(&recall).await.unwrap();
        assert_eq!(outcome["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_op_fails() {
        let handler = handler().await;
        let thought = Thought::new(ThoughtKind::MemoryRequest, serde_json::json!({ "op": "bogus" }), "test", ThoughtPriority::Normal);
        assert!(handler.handle(&thought).await.is_err());
    }
}

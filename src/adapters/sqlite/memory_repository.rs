//! SQLite implementation of the MemoryRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Memory, MemoryType};
use crate::domain::ports::MemoryRepository;

const MEMORY_COLUMNS: &str = "id, memory_type, content, embedding, importance, access_count, \
     last_accessed_at, associations, archived, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteMemoryRepository {
    pool: SqlitePool,
}

impl SqliteMemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemoryRepository for SqliteMemoryRepository {
    async fn store(&self, memory: &Memory) -> DomainResult<()> {
        let embedding_json = memory.embedding.as_ref().map(serde_json::to_string).transpose()?;
        let associations_json = serde_json::to_string(&memory.associations)?;

        sqlx::query(
            r#"INSERT INTO unified_memory
               (id, memory_type, content, embedding, importance, access_count,
                last_accessed_at, associations, archived, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(memory.id.to_string())
        .bind(memory.memory_type.as_str())
        .bind(&memory.content)
        .bind(embedding_json)
        .bind(memory.importance)
        .bind(memory.access_count as i64)
        .bind(memory.last_accessed_at.to_rfc3339())
        .bind(&associations_json)
        .bind(memory.archived)
        .bind(memory.created_at.to_rfc3339())
        .bind(memory.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT INTO unified_memory_fts (rowid, content) SELECT rowid, content FROM unified_memory WHERE id = ?")
            .bind(memory.id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Memory>> {
        let row: Option<MemoryRow> = sqlx::query_as(&format!(
            "SELECT {MEMORY_COLUMNS} FROM unified_memory WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, memory: &Memory) -> DomainResult<()> {
        let embedding_json = memory.embedding.as_ref().map(serde_json::to_string).transpose()?;
        let associations_json = serde_json::to_string(&memory.associations)?;

        let result = sqlx::query(
            r#"UPDATE unified_memory SET memory_type = ?, content = ?, embedding = ?,
               importance = ?, access_count = ?, last_accessed_at = ?, associations = ?,
               archived = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(memory.memory_type.as_str())
        .bind(&memory.content)
        .bind(embedding_json)
        .bind(memory.importance)
        .bind(memory.access_count as i64)
        .bind(memory.last_accessed_at.to_rfc3339())
        .bind(&associations_json)
        .bind(memory.archived)
        .bind(memory.updated_at.to_rfc3339())
        .bind(memory.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::MemoryNotFound(memory.id));
        }

        sqlx::query("UPDATE unified_memory_fts SET content = ? WHERE rowid = (SELECT rowid FROM unified_memory WHERE id = ?)")
            .bind(&memory.content)
            .bind(memory.id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM unified_memory WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::MemoryNotFound(id));
        }

        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
        query_embedding: Option<&[f32]>,
    ) -> DomainResult<Vec<Memory>> {
        // With an embedding to rerank against, pull a wider FTS candidate
        // pool so cosine similarity has more than `limit` rows to choose
        // from before truncating back down.
        let fetch_limit = if query_embedding.is_some() { limit.saturating_mul(5).max(limit) } else { limit };

        let mut sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM unified_memory \
             WHERE rowid IN (SELECT rowid FROM unified_memory_fts WHERE unified_memory_fts MATCH ?) \
             AND archived = 0"
        );
        if memory_type.is_some() {
            sql.push_str(" AND memory_type = ?");
        }
        sql.push_str(" ORDER BY importance DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, MemoryRow>(&sql).bind(query);
        if let Some(mt) = memory_type {
            q = q.bind(mt.as_str());
        }
        q = q.bind(fetch_limit as i64);

        let rows: Vec<MemoryRow> = q.fetch_all(&self.pool).await?;
        let mut memories: Vec<Memory> = rows.into_iter().map(TryInto::try_into).collect::<DomainResult<_>>()?;

        if let Some(embedding) = query_embedding {
            memories.sort_by(|a, b| {
                b.similarity_score(embedding)
                    .partial_cmp(&a.similarity_score(embedding))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        memories.truncate(limit);
        Ok(memories)
    }

    async fn list_by_type(&self, memory_type: MemoryType) -> DomainResult<Vec<Memory>> {
        let rows: Vec<MemoryRow> = sqlx::query_as(&format!(
            "SELECT {MEMORY_COLUMNS} FROM unified_memory \
             WHERE memory_type = ? AND archived = 0 ORDER BY last_accessed_at DESC"
        ))
        .bind(memory_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count_active(&self, memory_type: MemoryType) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM unified_memory WHERE memory_type = ? AND archived = 0",
        )
        .bind(memory_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn list_eviction_candidates(
        &self,
        memory_type: MemoryType,
        limit: usize,
    ) -> DomainResult<Vec<Memory>> {
        let rows: Vec<MemoryRow> = sqlx::query_as(&format!(
            "SELECT {MEMORY_COLUMNS} FROM unified_memory \
             WHERE memory_type = ? AND archived = 0 \
             ORDER BY importance ASC, last_accessed_at ASC LIMIT ?"
        ))
        .bind(memory_type.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count_by_type(&self) -> DomainResult<HashMap<MemoryType, u64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT memory_type, COUNT(*) as count FROM unified_memory WHERE archived = 0 GROUP BY memory_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for (type_str, count) in rows {
            if let Some(memory_type) = MemoryType::from_str(&type_str) {
                counts.insert(memory_type, count as u64);
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct MemoryRow {
    id: String,
    memory_type: String,
    content: String,
    embedding: Option<String>,
    importance: f32,
    access_count: i64,
    last_accessed_at: String,
    associations: Option<String>,
    archived: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<MemoryRow> for Memory {
    type Error = DomainError;

    fn try_from(row: MemoryRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let memory_type = MemoryType::from_str(&row.memory_type)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid memory type: {}", row.memory_type)))?;

        let embedding: Option<Vec<f32>> = row
            .embedding
            .map(|e| serde_json::from_str(&e))
            .transpose()
            .map_err(|e: serde_json::Error| DomainError::SerializationError(e.to_string()))?;

        let associations: Vec<Uuid> = super::parse_json_or_default(row.associations)?;
        let last_accessed_at = super::parse_datetime(&row.last_accessed_at)?;
        let created_at = super::parse_datetime(&row.created_at)?;
        let updated_at = super::parse_datetime(&row.updated_at)?;

        Ok(Memory {
            id,
            memory_type,
            content: row.content,
            embedding,
            importance: row.importance,
            access_count: row.access_count as u64,
            last_accessed_at,
            associations,
            archived: row.archived,
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteMemoryRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteMemoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let repo = setup_test_repo().await;
        let memory = Memory::new(MemoryType::Episodic, "saw a thing happen", 0.6);

        repo.store(&memory).await.unwrap();

        let retrieved = repo.get(memory.id).await.unwrap().unwrap();
        assert_eq!(retrieved.content, "saw a thing happen");
        assert_eq!(retrieved.memory_type, MemoryType::Episodic);
    }

    #[tokio::test]
    async fn test_update() {
        let repo = setup_test_repo().await;
        let mut memory = Memory::new(MemoryType::Working, "scratch note", 0.3);
        repo.store(&memory).await.unwrap();

        memory.reinforce(0.2);
        repo.update(&memory).await.unwrap();

        let retrieved = repo.get(memory.id).await.unwrap().unwrap();
        assert_eq!(retrieved.access_count, 1);
        assert!((retrieved.importance - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let memory = Memory::new(MemoryType::Semantic, "a fact", 0.5);
        repo.store(&memory).await.unwrap();

        repo.delete(memory.id).await.unwrap();
        assert!(repo.get(memory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_active_and_eviction_candidates() {
        let repo = setup_test_repo().await;
        let low = Memory::new(MemoryType::Working, "low importance", 0.1);
        let high = Memory::new(MemoryType::Working, "high importance", 0.9);
        repo.store(&low).await.unwrap();
        repo.store(&high).await.unwrap();

        assert_eq!(repo.count_active(MemoryType::Working).await.unwrap(), 2);

        let candidates = repo.list_eviction_candidates(MemoryType::Working, 1).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, low.id);
    }

    #[tokio::test]
    async fn test_search_finds_matching_content() {
        let repo = setup_test_repo().await;
        let memory = Memory::new(MemoryType::Semantic, "the gateway routes requests", 0.5);
        repo.store(&memory).await.unwrap();

        let results = repo.search("gateway", None, 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, memory.id);
    }

    #[tokio::test]
    async fn test_search_reranks_by_embedding_similarity() {
        let repo = setup_test_repo().await;
        let near = Memory::new(MemoryType::Semantic, "the gateway routes requests quickly", 0.2)
            .with_embedding(vec![1.0, 0.0, 0.0]);
        let far = Memory::new(MemoryType::Semantic, "the gateway routes requests slowly", 0.9)
            .with_embedding(vec![0.0, 1.0, 0.0]);
        repo.store(&near).await.unwrap();
        repo.store(&far).await.unwrap();

        let results = repo.search("gateway", None, 10, Some(&[1.0, 0.0, 0.0])).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, near.id);
    }
}

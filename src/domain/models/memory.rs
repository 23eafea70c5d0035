//! Memory domain model.
//!
//! A memory entry is a piece of content the runtime has chosen to retain,
//! along with enough bookkeeping (access recency, importance, an optional
//! embedding) to support recall, decay, and bounded eviction of the working
//! set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Kind of memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A specific recalled event
    Episodic,
    /// A generalized fact or relationship
    Semantic,
    /// A learned procedure or how-to
    Procedural,
    /// Short-lived, bounded scratch memory
    Working,
    /// Durable, not subject to the working-memory eviction bound
    LongTerm,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Working => "working",
            Self::LongTerm => "long_term",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "episodic" => Some(Self::Episodic),
            "semantic" => Some(Self::Semantic),
            "procedural" => Some(Self::Procedural),
            "working" => Some(Self::Working),
            "long_term" | "longterm" => Some(Self::LongTerm),
            _ => None,
        }
    }
}

/// A retained unit of memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub memory_type: MemoryType,
    pub content: String,
    /// Embedding vector, if one has been computed. Absent until an
    /// embedding driver runs or the deterministic fallback is applied.
    pub embedding: Option<Vec<f32>>,
    /// Importance in [0, 1]; used as the primary eviction key for working
    /// memory (ascending, i.e. least important evicted first).
    pub importance: f32,
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
    /// Ids of related memory entries.
    #[serde(default)]
    pub associations: Vec<Uuid>,
    /// Archived entries are excluded from recall.
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(memory_type: MemoryType, content: impl Into<String>, importance: f32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            memory_type,
            content: content.into(),
            embedding: None,
            importance: importance.clamp(0.0, 1.0),
            access_count: 0,
            last_accessed_at: now,
            associations: Vec::new(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_association(mut self, memory_id: Uuid) -> Self {
        if !self.associations.contains(&memory_id) {
            self.associations.push(memory_id);
        }
        self
    }

    /// Record an access: increments `access_count`, bumps `last_accessed_at`.
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
        self.updated_at = self.last_accessed_at;
    }

    /// Reinforce this memory by raising its importance and recording an
    /// access, used when a handler decides this entry proved useful.
    pub fn reinforce(&mut self, delta: f32) {
        self.importance = (self.importance + delta).clamp(0.0, 1.0);
        self.record_access();
    }

    pub fn archive(&mut self) {
        self.archived = true;
        self.updated_at = Utc::now();
    }

    /// Cosine similarity against a query embedding, or `None` if either
    /// vector is absent or the dimensions disagree.
    pub fn cosine_similarity(&self, query_embedding: &[f32]) -> Option<f32> {
        let own = self.embedding.as_ref()?;
        if own.len() != query_embedding.len() || own.is_empty() {
            return None;
        }
        let dot: f32 = own.iter().zip(query_embedding).map(|(a, b)| a * b).sum();
        let norm_a: f32 = own.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b: f32 = query_embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return None;
        }
        Some(dot / (norm_a * norm_b))
    }

    /// Similarity used for ranking recall results: `1 - cosine_distance`,
    /// i.e. the cosine similarity itself.
    pub fn similarity_score(&self, query_embedding: &[f32]) -> f32 {
        self.cosine_similarity(query_embedding).unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.content.is_empty() {
            return Err("memory content cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.importance) {
            return Err("memory importance must be in [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Deterministic fallback embedding used when the configured embedding
/// driver is unavailable. Hashes `text` with SHA-256, cycles the digest
/// bytes to fill `dim` components, maps each byte to `(byte / 255.0) - 0.5`,
/// then L2-normalizes the result.
///
/// Being a pure function of `text` and `dim`, it is stable across restarts:
/// the same text always yields the same vector, which is sufficient for the
/// cosine-similarity recall path to behave consistently even without a real
/// embedding model configured.
pub fn deterministic_hash_embedding(text: &str, dim: usize) -> Vec<f32> {
    if dim == 0 {
        return Vec::new();
    }
    let digest = Sha256::digest(text.as_bytes());
    let mut values = Vec::with_capacity(dim);
    for i in 0..dim {
        let byte = digest[i % digest.len()];
        values.push((f32::from(byte) / 255.0) - 0.5);
    }
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_creation_clamps_importance() {
        let memory = Memory::new(MemoryType::Episodic, "saw a thing", 1.5);
        assert_eq!(memory.importance, 1.0);
        assert_eq!(memory.access_count, 0);
        assert!(!memory.archived);
    }

    #[test]
    fn record_access_increments_count_and_timestamp() {
        let mut memory = Memory::new(MemoryType::Working, "scratch", 0.5);
        let first = memory.last_accessed_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        memory.record_access();
        assert_eq!(memory.access_count, 1);
        assert!(memory.last_accessed_at >= first);
    }

    #[test]
    fn reinforce_raises_importance_and_clamps() {
        let mut memory = Memory::new(MemoryType::Semantic, "fact", 0.9);
        memory.reinforce(0.5);
        assert_eq!(memory.importance, 1.0);
        assert_eq!(memory.access_count, 1);
    }

    #[test]
    fn archive_sets_flag() {
        let mut memory = Memory::new(MemoryType::LongTerm, "old", 0.2);
        memory.archive();
        assert!(memory.archived);
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let memory = Memory::new(MemoryType::Semantic, "x", 0.5)
            .with_embedding(vec![1.0, 0.0, 0.0]);
        let sim = memory.cosine_similarity(&[1.0, 0.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_missing_embedding_is_none() {
        let memory = Memory::new(MemoryType::Semantic, "x", 0.5);
        assert!(memory.cosine_similarity(&[1.0, 0.0]).is_none());
    }

    #[test]
    fn deterministic_hash_embedding_is_stable_and_normalized() {
        let a = deterministic_hash_embedding("hello world", 16);
        let b = deterministic_hash_embedding("hello world", 16);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn deterministic_hash_embedding_differs_for_different_text() {
        let a = deterministic_hash_embedding("foo", 8);
        let b = deterministic_hash_embedding("bar", 8);
        assert_ne!(a, b);
    }

    #[test]
    fn memory_type_round_trips_through_str() {
        for t in [
            MemoryType::Episodic,
            MemoryType::Semantic,
            MemoryType::Procedural,
            MemoryType::Working,
            MemoryType::LongTerm,
        ] {
            assert_eq!(MemoryType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn validate_rejects_empty_content() {
        let memory = Memory::new(MemoryType::Episodic, "", 0.5);
        assert!(memory.validate().is_err());
    }
}

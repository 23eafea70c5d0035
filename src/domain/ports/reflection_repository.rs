//! Reflection repository port: self-reflection passes and their insights.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Insight, Reflection};

#[async_trait]
pub trait ReflectionRepository: Send + Sync {
    async fn record_reflection(&self, reflection: &Reflection) -> DomainResult<()>;

    async fn record_insight(&self, insight: &Insight) -> DomainResult<()>;

    async fn list_recent_insights(&self, limit: usize) -> DomainResult<Vec<Insight>>;
}

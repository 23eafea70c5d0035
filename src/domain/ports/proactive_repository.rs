//! Proactive repository port: opportunities and predictions.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Opportunity, Prediction};

#[async_trait]
pub trait ProactiveRepository: Send + Sync {
    async fn record_opportunity(&self, opportunity: &Opportunity) -> DomainResult<()>;

    /// Active (non-expired, not yet acted upon) opportunities, most
    /// urgent expiry first.
    async fn list_active_opportunities(&self) -> DomainResult<Vec<Opportunity>>;

    async fn mark_acted_upon(&self, id: Uuid) -> DomainResult<()>;

    async fn record_prediction(&self, prediction: &Prediction) -> DomainResult<()>;

    async fn list_predictions_for_subject(&self, subject_table: &str, subject_id: Uuid) -> DomainResult<Vec<Prediction>>;
}

//! Provider driver port.
//!
//! The fallback gateway depends on this narrow interface rather than any
//! concrete vendor's wire protocol; each adapter under
//! `adapters::providers` implements one vendor.

use async_trait::async_trait;

use crate::domain::error::ProviderError;
use crate::domain::models::GenerateOptions;

#[async_trait]
pub trait ProviderDriver: Send + Sync {
    /// Human identifier for this provider, used in provider-health tracking
    /// and in gateway metrics (`per_provider_usage`).
    fn name(&self) -> &str;

    /// Perform one generation call.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError>;
}

//! Provider fallback gateway.
//!
//! Dispatches a generation request across a configured chain of provider
//! drivers, skipping unavailable providers, caching responses, and
//! exposing call metrics. See [`crate::domain::models::Provider`] for the
//! per-provider health state this gateway maintains.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::domain::error::ProviderError;
use crate::domain::models::{GatewayConfig, GenerateOptions, Provider};
use crate::domain::ports::ProviderDriver;

/// One cached response, keyed externally by its fingerprint.
#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: String,
    response_text: String,
    provider_used: String,
    elapsed_ms: u64,
    stored_at: Instant,
}

/// Outcome of a successful `generate` call.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub response: String,
    pub provider_used: String,
    pub elapsed_ms: u64,
    pub from_cache: bool,
}

/// Aggregate gateway metrics for observability endpoints.
#[derive(Debug, Clone, Default)]
pub struct GatewayMetrics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub per_provider_usage: HashMap<String, u64>,
    pub recent_errors: Vec<String>,
    pub available: Vec<String>,
    pub unavailable: Vec<String>,
    pub cache_size: usize,
    pub cache_hit_rate: f64,
}

struct GatewayState {
    providers: Vec<(Provider, Arc<dyn ProviderDriver>)>,
    cache: VecDeque<CacheEntry>,
    total_requests: u64,
    cache_hits: u64,
    per_provider_usage: HashMap<String, u64>,
    recent_errors: VecDeque<String>,
}

/// Multi-provider dispatcher with health tracking, response caching, and
/// retry-with-backoff.
pub struct ProviderGateway {
    state: RwLock<GatewayState>,
    config: GatewayConfig,
}

impl ProviderGateway {
    /// Build a gateway from `(driver, priority_rank)` pairs, lowest rank
    /// tried first.
    pub fn new(drivers: Vec<(Arc<dyn ProviderDriver>, u32)>, config: GatewayConfig) -> Self {
        let mut providers: Vec<(Provider, Arc<dyn ProviderDriver>)> = drivers
            .into_iter()
            .map(|(driver, rank)| (Provider::new(driver.name().to_string(), rank), driver))
            .collect();
        providers.sort_by_key(|(p, _)| p.priority_rank);

        Self {
            state: RwLock::new(GatewayState {
                providers,
                cache: VecDeque::new(),
                total_requests: 0,
                cache_hits: 0,
                per_provider_usage: HashMap::new(),
                recent_errors: VecDeque::new(),
            }),
            config,
        }
    }

    /// Generate one response, trying providers in priority order.
    #[instrument(skip(self, prompt, options))]
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        use_cache: bool,
        allow_fallback: bool,
    ) -> Result<GenerateResult, ProviderError> {
        let fingerprint = options.fingerprint(prompt);

        {
            let mut state = self.state.write().await;
            state.total_requests += 1;

            if use_cache {
                if let Some(entry) = state.cache.iter().find(|e| e.fingerprint == fingerprint) {
                    state.cache_hits += 1;
                    return Ok(GenerateResult {
                        response: entry.response_text.clone(),
                        provider_used: entry.provider_used.clone(),
                        elapsed_ms: entry.elapsed_ms,
                        from_cache: true,
                    });
                }
            }
        }

        let provider_order: Vec<(String, Arc<dyn ProviderDriver>, bool)> = {
            let state = self.state.read().await;
            state
                .providers
                .iter()
                .map(|(p, driver)| (p.name.clone(), driver.clone(), p.available))
                .collect()
        };

        let mut accumulated_errors = Vec::new();

        for (name, driver, available) in provider_order {
            if !available {
                continue;
            }

            let started = Instant::now();
            let outcome = timeout(Duration::from_secs(30), driver.generate(prompt, options)).await;

            let result = match outcome {
                Ok(inner) => inner,
                Err(_) => Err(ProviderError::Timeout(30)),
            };

            match result {
                Ok(response_text) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    let mut state = self.state.write().await;
                    if let Some((provider, _)) = state.providers.iter_mut().find(|(p, _)| p.name == name) {
                        provider.record_success();
                    }
                    *state.per_provider_usage.entry(name.clone()).or_insert(0) += 1;

                    if use_cache {
                        Self::insert_cache(&mut state.cache, CacheEntry {
                            fingerprint: fingerprint.clone(),
                            response_text: response_text.clone(),
                            provider_used: name.clone(),
                            elapsed_ms,
                            stored_at: Instant::now(),
                        }, &self.config);
                    }

                    return Ok(GenerateResult {
                        response: response_text,
                        provider_used: name,
                        elapsed_ms,
                        from_cache: false,
                    });
                }
                Err(error) => {
                    let bypass = error.bypasses_streak_threshold();
                    {
                        let mut state = self.state.write().await;
                        if let Some((provider, _)) = state.providers.iter_mut().find(|(p, _)| p.name == name) {
                            provider.record_failure(self.config.failure_streak_threshold, bypass);
                        }
                    }
                    let message = format!("{name}: {error}");
                    warn!(provider = %name, error = %error, "provider call failed");
                    self.push_recent_error(message.clone()).await;
                    accumulated_errors.push(message);

                    if !allow_fallback {
                        break;
                    }
                }
            }
        }

        Err(ProviderError::AllProvidersExhausted { errors: accumulated_errors })
    }

    /// `generate` wrapped with exponential backoff between attempts.
    /// Between attempts, providers whose `failure_count` is still below
    /// the configured threshold are reset so they are reconsidered.
    #[instrument(skip(self, prompt, options))]
    pub async fn generate_with_retry(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        max_retries: u32,
    ) -> Result<GenerateResult, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.generate(prompt, options, true, true).await {
                Ok(result) => return Ok(result),
                Err(error) if attempt < max_retries => {
                    attempt += 1;
                    self.reconsider_providers_below_threshold().await;
                    let delay = self.config.base_delay_ms * 2u64.pow(attempt);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    info!(attempt, error = %error, "retrying generate after backoff");
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn reconsider_providers_below_threshold(&self) {
        let mut state = self.state.write().await;
        let threshold = self.config.failure_streak_threshold;
        for (provider, _) in &mut state.providers {
            if !provider.available && provider.failure_count < threshold {
                provider.reset();
            }
        }
    }

    async fn push_recent_error(&self, message: String) {
        let mut state = self.state.write().await;
        state.recent_errors.push_back(message);
        while state.recent_errors.len() > self.config.recent_errors_cap {
            state.recent_errors.pop_front();
        }
    }

    fn insert_cache(cache: &mut VecDeque<CacheEntry>, entry: CacheEntry, config: &GatewayConfig) {
        cache.push_back(entry);
        if cache.len() > config.cache_size {
            while cache.len() > config.cache_eviction_keep {
                cache.pop_front();
            }
        }
    }

    /// Reset every provider to available with a zeroed failure count.
    pub async fn reset_all(&self) {
        let mut state = self.state.write().await;
        for (provider, _) in &mut state.providers {
            provider.reset();
        }
    }

    /// Drop every cached response. Used by the self-optimization handler
    /// when process memory breaches threshold; the cache rebuilds itself
    /// on the next cache-miss generation.
    pub async fn clear_cache(&self) -> usize {
        let mut state = self.state.write().await;
        let dropped = state.cache.len();
        state.cache.clear();
        dropped
    }

    pub async fn metrics(&self) -> GatewayMetrics {
        let state = self.state.read().await;
        let available = state.providers.iter().filter(|(p, _)| p.available).map(|(p, _)| p.name.clone()).collect();
        let unavailable = state.providers.iter().filter(|(p, _)| !p.available).map(|(p, _)| p.name.clone()).collect();
        let cache_hit_rate = if state.total_requests == 0 {
            0.0
        } else {
            state.cache_hits as f64 / state.total_requests as f64
        };

        GatewayMetrics {
            total_requests: state.total_requests,
            cache_hits: state.cache_hits,
            per_provider_usage: state.per_provider_usage.clone(),
            recent_errors: state.recent_errors.iter().cloned().collect(),
            available,
            unavailable,
            cache_size: state.cache.len(),
            cache_hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::providers::{MockDriver, mock::{MockFailure, ScriptedResponse}};

    fn config() -> GatewayConfig {
        GatewayConfig {
            failure_streak_threshold: 2,
            cache_size: 10,
            cache_eviction_keep: 5,
            recent_errors_cap: 10,
            max_retries: 2,
            base_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_generate_uses_first_available_provider() {
        let primary = Arc::new(MockDriver::fixed("primary", "primary response"));
        let gateway = ProviderGateway::new(vec![(primary, 0)], config());

        let result = gateway
            .generate("hi", &GenerateOptions::default(), true, true)
            .await
            .unwrap();

        assert_eq!(result.provider_used, "primary");
        assert!(!result.from_cache);
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_failure() {
        let primary = Arc::new(MockDriver::scripted(
            "primary",
            vec![ScriptedResponse::Fail(MockFailure::Transient)],
        ));
        let secondary = Arc::new(MockDriver::fixed("secondary", "fallback response"));
        let gateway = ProviderGateway::new(vec![(primary, 0), (secondary, 1)], config());

        let result = gateway
            .generate("hi", &GenerateOptions::default(), false, true)
            .await
            .unwrap();

        assert_eq!(result.provider_used, "secondary");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let driver = Arc::new(MockDriver::fixed("primary", "cached response"));
        let gateway = ProviderGateway::new(vec![(driver, 0)], config());
        let options = GenerateOptions::default();

        gateway.generate("hi", &options, true, true).await.unwrap();
        let second = gateway.generate("hi", &options, true, true).await.unwrap();

        assert!(second.from_cache);
        let metrics = gateway.metrics().await;
        assert_eq!(metrics.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_provider_becomes_unavailable_after_threshold() {
        let driver = Arc::new(MockDriver::scripted(
            "primary",
            vec![
                ScriptedResponse::Fail(MockFailure::Transient),
                ScriptedResponse::Fail(MockFailure::Transient),
            ],
        ));
        let gateway = ProviderGateway::new(vec![(driver, 0)], config());

        let _ = gateway.generate("hi", &GenerateOptions::default(), false, true).await;
        let _ = gateway.generate("hi", &GenerateOptions::default(), false, true).await;

        let metrics = gateway.metrics().await;
        assert!(metrics.unavailable.contains(&"primary".to_string()));
    }

    #[tokio::test]
    async fn test_all_providers_exhausted() {
        let driver = Arc::new(MockDriver::scripted(
            "only",
            vec![ScriptedResponse::Fail(MockFailure::Transient)],
        ));
        let gateway = ProviderGateway::new(vec![(driver, 0)], config());

        let result = gateway.generate("hi", &GenerateOptions::default(), false, true).await;
        assert!(matches!(result, Err(ProviderError::AllProvidersExhausted { .. })));
    }

    #[tokio::test]
    async fn test_reset_all_clears_unavailability() {
        let driver = Arc::new(MockDriver::scripted(
            "primary",
            vec![
                ScriptedResponse::Fail(MockFailure::Transient),
                ScriptedResponse::Fail(MockFailure::Transient),
            ],
        ));
        let gateway = ProviderGateway::new(vec![(driver, 0)], config());
        let _ = gateway.generate("hi", &GenerateOptions::default(), false, true).await;
        let _ = gateway.generate("hi", &GenerateOptions::default(), false, true).await;

        gateway.reset_all().await;
        let metrics = gateway.metrics().await;
        assert!(metrics.available.contains(&"primary".to_string()));
    }
}
